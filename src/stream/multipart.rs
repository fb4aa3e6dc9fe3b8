//! Multipart (MJPEG) chunk encoding
//!
//! Wire layout of a stream response body:
//!
//! ```text
//! \r\n--<boundary>\r\n                       initial boundary
//! Content-Type: image/jpeg\r\n               ┐
//! Content-Length: <n>\r\n                    │ per frame
//! \r\n                                       │
//! <n bytes of JPEG>                          │
//! \r\n--<boundary>\r\n                       ┘
//! ```

use bytes::{Bytes, BytesMut};
use std::fmt::Write;

/// Boundary token separating frames
pub const PART_BOUNDARY: &str = "123456789000000000000987654321";

/// Response content type for the stream
pub const STREAM_CONTENT_TYPE: &str =
    "multipart/x-mixed-replace;boundary=123456789000000000000987654321";

/// Boundary line written before the first frame and after every frame
pub const STREAM_BOUNDARY: &str = "\r\n--123456789000000000000987654321\r\n";

const PART_TYPE_LINE: &str = "Content-Type: image/jpeg\r\n";
const PART_LENGTH_PREFIX: &str = "Content-Length: ";
const PART_TERMINATOR: &str = "\r\n\r\n";

/// Largest frame payload the encoder describes, in bytes.
pub const MAX_FRAME_LEN: u64 = u64::MAX;

/// Decimal digits needed for [`MAX_FRAME_LEN`]
const MAX_LENGTH_DIGITS: usize = 20;

/// Capacity that holds any part header this module produces.
pub const PART_HEADER_CAPACITY: usize =
    PART_TYPE_LINE.len() + PART_LENGTH_PREFIX.len() + MAX_LENGTH_DIGITS + PART_TERMINATOR.len();

/// Initial boundary chunk that opens the stream body
pub fn stream_boundary() -> Bytes {
    Bytes::from_static(STREAM_BOUNDARY.as_bytes())
}

/// Format the part header for a payload of `len` bytes.
pub fn part_header(len: usize) -> Bytes {
    let mut header = BytesMut::with_capacity(PART_HEADER_CAPACITY);
    header.extend_from_slice(PART_TYPE_LINE.as_bytes());
    header.extend_from_slice(PART_LENGTH_PREFIX.as_bytes());
    // BytesMut grows on demand, so fmt::Write cannot fail here.
    let _ = write!(header, "{}", len as u64);
    header.extend_from_slice(PART_TERMINATOR.as_bytes());
    header.freeze()
}

/// One frame encoded as its three ordered chunk writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartChunk {
    /// Part header stating the payload length
    pub header: Bytes,
    /// JPEG bytes, untouched
    pub payload: Bytes,
    /// Trailing boundary line
    pub boundary: Bytes,
}

impl MultipartChunk {
    /// Encode a JPEG payload. The payload is shared, not copied.
    pub fn for_payload(payload: Bytes) -> Self {
        Self { header: part_header(payload.len()), payload, boundary: stream_boundary() }
    }

    /// Chunks in wire order
    pub fn into_parts(self) -> [Bytes; 3] {
        [self.header, self.payload, self.boundary]
    }

    /// Total bytes this frame adds to the response body
    pub fn encoded_len(&self) -> usize {
        self.header.len() + self.payload.len() + self.boundary.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn constants_share_one_boundary() {
        assert!(STREAM_CONTENT_TYPE.ends_with(&format!("boundary={PART_BOUNDARY}")));
        assert_eq!(STREAM_BOUNDARY, format!("\r\n--{PART_BOUNDARY}\r\n"));
    }

    #[test]
    fn header_layout() {
        let header = part_header(4321);
        assert_eq!(&header[..], b"Content-Type: image/jpeg\r\nContent-Length: 4321\r\n\r\n");
    }

    #[test]
    fn empty_payload_is_described_as_zero_length() {
        let chunk = MultipartChunk::for_payload(Bytes::new());
        assert_eq!(&chunk.header[..], b"Content-Type: image/jpeg\r\nContent-Length: 0\r\n\r\n");
        assert!(chunk.payload.is_empty());
    }

    #[test]
    fn largest_length_fits_the_header_capacity() {
        let header = part_header(usize::MAX);
        assert!(header.len() <= PART_HEADER_CAPACITY);
        assert!(header.ends_with(b"\r\n\r\n"));
    }

    #[test]
    fn parts_come_out_in_wire_order() {
        let payload = Bytes::from_static(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]);
        let chunk = MultipartChunk::for_payload(payload.clone());
        assert_eq!(chunk.encoded_len(), chunk.header.len() + 5 + STREAM_BOUNDARY.len());

        let [header, body, boundary] = chunk.into_parts();
        assert!(header.starts_with(b"Content-Type: image/jpeg"));
        assert_eq!(body, payload);
        assert_eq!(&boundary[..], STREAM_BOUNDARY.as_bytes());
    }

    proptest! {
        #[test]
        fn header_states_exact_payload_length(payload in prop::collection::vec(any::<u8>(), 0..4096)) {
            let len = payload.len();
            let chunk = MultipartChunk::for_payload(Bytes::from(payload.clone()));

            let header = std::str::from_utf8(&chunk.header).unwrap();
            let expected = format!("Content-Length: {len}\r\n");
            prop_assert!(header.contains(&expected));
            prop_assert_eq!(chunk.payload.len(), len);
            prop_assert_eq!(&chunk.payload[..], &payload[..]);
        }
    }
}
