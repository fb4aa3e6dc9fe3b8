//! Frame source trait for camera pipelines

use crate::Result;
use crate::types::Frame;

/// Trait for camera frame sources
///
/// A source owns a pool of frame buffers and lends one frame at a time.
/// Callers must hand every acquired frame back through [`release`] before
/// asking for the next one; sources are free to refuse a frame while their
/// pool is empty.
///
/// [`release`]: FrameSource::release
#[async_trait::async_trait]
pub trait FrameSource: Send + 'static {
    /// Acquire the next captured frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - Frame captured, lent to the caller
    /// - `Ok(None)` - No frame available right now
    /// - `Err(e)` - The capture pipeline failed
    async fn acquire(&mut self) -> Result<Option<Frame>>;

    /// Return a frame's buffer to the source
    ///
    /// Pooled buffers go back to the pool, one-off buffers are freed.
    fn release(&mut self, frame: Frame);
}

#[async_trait::async_trait]
impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    async fn acquire(&mut self) -> Result<Option<Frame>> {
        (**self).acquire().await
    }

    fn release(&mut self, frame: Frame) {
        (**self).release(frame)
    }
}
