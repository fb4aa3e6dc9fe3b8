//! Camera frame types

use bytes::Bytes;
use std::fmt;

/// Pixel format tag reported by the frame source.
///
/// Only [`PixelFormat::Jpeg`] frames can be streamed; the others exist so a
/// misconfigured pipeline is reported instead of streamed as garbage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Jpeg,
    Rgb565,
    Yuv422,
    Grayscale,
    /// Payload of unrecognised layout
    Raw,
}

impl PixelFormat {
    /// Guess the format of an encoded buffer from its leading bytes.
    ///
    /// Anything starting with the JPEG start-of-image marker is JPEG,
    /// everything else is [`PixelFormat::Raw`].
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&[0xFF, 0xD8]) { PixelFormat::Jpeg } else { PixelFormat::Raw }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PixelFormat::Jpeg => "jpeg",
            PixelFormat::Rgb565 => "rgb565",
            PixelFormat::Yuv422 => "yuv422",
            PixelFormat::Grayscale => "grayscale",
            PixelFormat::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// Ownership token identifying the buffer a frame was lent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameToken {
    /// Slot in the frame source's buffer pool; must be handed back.
    Pooled(usize),
    /// Buffer allocated for this frame only; freed on release.
    Owned,
}

/// One captured frame lent out by a [`FrameSource`](crate::FrameSource).
///
/// The frame stays owned by the source until it is passed back through
/// [`FrameSource::release`](crate::FrameSource::release). `Frame` is not
/// `Clone`, so a frame can only be released once.
#[derive(Debug)]
pub struct Frame {
    /// Encoding of `data`
    pub format: PixelFormat,

    /// Encoded payload, passed to the client verbatim
    pub data: Bytes,

    /// Buffer ownership token
    pub token: FrameToken,

    /// Sequence number assigned by the source
    pub sequence: u64,
}

impl Frame {
    /// Create a new frame
    pub fn new(format: PixelFormat, data: Bytes, token: FrameToken, sequence: u64) -> Self {
        Self { format, data, token, sequence }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether this frame can be sent on an MJPEG stream
    pub fn is_jpeg(&self) -> bool {
        self.format == PixelFormat::Jpeg
    }
}
