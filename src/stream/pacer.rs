//! Frame pacing
//!
//! The pacer enforces a minimum time between frames, giving a soft upper
//! bound on frame rate. Frames still arrive slower when the camera or the
//! network is slow; they never arrive faster.
//!
//! Timestamps are monotonic microseconds, elapsed time is whole
//! milliseconds (truncating division). The sub-millisecond remainder is
//! dropped every frame and is not carried over, so the achieved rate can
//! sit slightly above the target.

use std::time::Duration;

/// Delay in milliseconds needed to stretch `elapsed_ms` to `min_interval_ms`.
pub fn frame_delay_ms(min_interval_ms: u64, elapsed_ms: u64) -> u64 {
    min_interval_ms.saturating_sub(elapsed_ms)
}

/// Pacing state for one stream session.
#[derive(Debug, Clone)]
pub struct FramePacer {
    min_interval_ms: u64,
    last_frame_us: Option<u64>,
}

impl FramePacer {
    /// Create a pacer with no previous frame
    pub fn new(min_interval: Duration) -> Self {
        let min_interval_ms = u64::try_from(min_interval.as_millis()).unwrap_or(u64::MAX);
        Self { min_interval_ms, last_frame_us: None }
    }

    /// Configured minimum interval
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Timestamp of the last frame, `None` when unset
    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame_us
    }

    /// Seed the last-frame timestamp if it is unset.
    pub fn start(&mut self, now_us: u64) {
        if self.last_frame_us.is_none() {
            self.last_frame_us = Some(now_us);
        }
    }

    /// Whole milliseconds since the last frame (zero when unset)
    pub fn elapsed_ms(&self, now_us: u64) -> u64 {
        let last = self.last_frame_us.unwrap_or(now_us);
        now_us.saturating_sub(last) / 1000
    }

    /// Delay to apply after a frame that took `elapsed_ms`
    pub fn delay_for(&self, elapsed_ms: u64) -> Duration {
        Duration::from_millis(frame_delay_ms(self.min_interval_ms, elapsed_ms))
    }

    /// Record `now_us` as the last frame time
    pub fn mark(&mut self, now_us: u64) {
        self.last_frame_us = Some(now_us);
    }

    /// Forget the last frame so the next session starts fresh
    pub fn reset(&mut self) {
        self.last_frame_us = None;
    }
}
