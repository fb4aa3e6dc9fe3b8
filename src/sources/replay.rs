//! Replay source that cycles through JPEG stills on disk

use bytes::Bytes;
use std::path::Path;
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace, warn};

use crate::source::FrameSource;
use crate::types::{Frame, FrameToken, PixelFormat};
use crate::{Result, StreamError};

/// Frame source that replays still images from a directory.
///
/// Images are loaded once and lent out in file-name order, wrapping at the
/// end. Like a camera driver it owns a fixed pool of frame buffers: when
/// every buffer is lent out, [`acquire`](FrameSource::acquire) reports no
/// frame until one is released.
pub struct ReplaySource {
    /// Encoded stills, in playback order
    images: Vec<(PixelFormat, Bytes)>,

    /// Next image to lend
    position: usize,

    /// Buffer slots; `true` while lent out
    slots: Vec<bool>,

    /// Sequence number for the next frame
    sequence: u64,

    /// Capture pacing, emulating the sensor frame rate
    capture: Option<Interval>,
}

impl ReplaySource {
    /// Load every `.jpg` / `.jpeg` file in `dir`.
    ///
    /// Files whose content does not start with a JPEG marker are kept and
    /// reported with a non-JPEG format tag.
    pub fn open<P: AsRef<Path>>(dir: P, pool_size: usize) -> Result<Self> {
        let dir = dir.as_ref();
        let entries =
            std::fs::read_dir(dir).map_err(|e| StreamError::io_error(dir.to_path_buf(), e))?;

        let mut paths: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
            })
            .collect();
        paths.sort();

        let mut images = Vec::with_capacity(paths.len());
        for path in &paths {
            let data = std::fs::read(path).map_err(|e| StreamError::io_error(path.clone(), e))?;
            let format = PixelFormat::sniff(&data);
            if format != PixelFormat::Jpeg {
                warn!("{} does not look like a JPEG", path.display());
            }
            images.push((format, Bytes::from(data)));
        }

        info!("Loaded {} stills from {}", images.len(), dir.display());
        Self::from_images(images, pool_size)
    }

    /// Build a source from in-memory encoded images.
    pub fn from_images(images: Vec<(PixelFormat, Bytes)>, pool_size: usize) -> Result<Self> {
        if images.is_empty() {
            return Err(StreamError::source_failed("no images to replay"));
        }
        if pool_size == 0 {
            return Err(StreamError::config("frame pool needs at least one buffer"));
        }
        Ok(Self { images, position: 0, slots: vec![false; pool_size], sequence: 0, capture: None })
    }

    /// Build a source from JPEG payloads
    pub fn from_jpegs(jpegs: impl IntoIterator<Item = Bytes>, pool_size: usize) -> Result<Self> {
        let images = jpegs.into_iter().map(|data| (PixelFormat::sniff(&data), data)).collect();
        Self::from_images(images, pool_size)
    }

    /// Emit at most `fps` frames per second
    pub fn with_capture_rate(mut self, fps: u32) -> Self {
        let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
        let mut capture = interval(period);
        capture.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.capture = Some(capture);
        debug!("Capture rate set to {} fps", fps);
        self
    }

    /// Number of stills in the playback loop
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Buffers currently lent out
    pub fn frames_in_use(&self) -> usize {
        self.slots.iter().filter(|in_use| **in_use).count()
    }
}

#[async_trait::async_trait]
impl FrameSource for ReplaySource {
    async fn acquire(&mut self) -> Result<Option<Frame>> {
        let Some(slot) = self.slots.iter().position(|in_use| !in_use) else {
            debug!("All {} frame buffers in use", self.slots.len());
            return Ok(None);
        };

        if let Some(capture) = self.capture.as_mut() {
            capture.tick().await;
        }

        let (format, data) = &self.images[self.position];
        let frame = Frame::new(*format, data.clone(), FrameToken::Pooled(slot), self.sequence);
        trace!(sequence = self.sequence, slot, bytes = data.len(), "Frame lent");

        self.slots[slot] = true;
        self.sequence += 1;
        self.position = (self.position + 1) % self.images.len();
        Ok(Some(frame))
    }

    fn release(&mut self, frame: Frame) {
        match frame.token {
            FrameToken::Pooled(slot) => match self.slots.get_mut(slot) {
                Some(in_use) if *in_use => *in_use = false,
                _ => warn!(slot, sequence = frame.sequence, "Release of a buffer that was not lent"),
            },
            FrameToken::Owned => drop(frame),
        }
    }
}
