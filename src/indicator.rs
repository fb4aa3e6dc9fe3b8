//! Status LED and lamp side effects

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Visual acknowledgement patterns on the status LED
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    /// One short flash
    Flash,
    /// Two short flashes separated by a short gap
    DoubleFlash,
}

impl Pulse {
    /// Length of a single flash, and of the gap between two flashes
    pub const FLASH: Duration = Duration::from_millis(75);

    /// Number of flashes in this pattern
    pub fn flashes(self) -> u32 {
        match self {
            Pulse::Flash => 1,
            Pulse::DoubleFlash => 2,
        }
    }
}

/// Device side-channel for the status LED and the illumination lamp.
///
/// Both are global device state. Stream sessions drive them without
/// locking; the single-viewer design keeps them from racing.
#[async_trait::async_trait]
pub trait Indicator: Send + Sync + 'static {
    /// Play a pulse pattern on the status LED
    async fn signal(&self, pulse: Pulse);

    /// Set the lamp brightness in percent (0 = off)
    fn set_lamp(&self, level: u8);
}

/// Indicator for hosts without LED or lamp hardware.
///
/// Every side effect becomes a log line and the last lamp level is kept
/// so it can be reported.
#[derive(Debug, Default)]
pub struct LogIndicator {
    lamp: AtomicU8,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last lamp level set, in percent
    pub fn lamp_level(&self) -> u8 {
        self.lamp.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl Indicator for LogIndicator {
    async fn signal(&self, pulse: Pulse) {
        debug!(flashes = pulse.flashes(), "Status LED pulse");
    }

    fn set_lamp(&self, level: u8) {
        let level = level.min(100);
        self.lamp.store(level, Ordering::Relaxed);
        info!(level, "Lamp set");
    }
}
