//! Monotonic clock used for frame timing

use tokio::time::Instant;

/// Monotonic microsecond clock
pub trait Clock: Send + Sync + 'static {
    /// Microseconds since an arbitrary fixed origin; never goes backwards
    fn now_micros(&self) -> u64;
}

/// Clock backed by the tokio timer.
///
/// Follows tokio's paused test time, so pacing can be tested without
/// real sleeps.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}
