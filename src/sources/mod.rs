//! Frame source implementations

pub mod replay;

pub use replay::ReplaySource;

use crate::Result;
use crate::source::FrameSource;
use crate::types::Frame;

/// Source for a device whose camera failed to start; never lends a frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

#[async_trait::async_trait]
impl FrameSource for NoCamera {
    async fn acquire(&mut self) -> Result<Option<Frame>> {
        Ok(None)
    }

    fn release(&mut self, _frame: Frame) {}
}
