//! Process-wide stream state shared between the server and stream sessions.
//!
//! The server is built around a single concurrent viewer, so this is plain
//! set/see state: atomics with no locking and no arbitration between
//! sessions. The kill flag is advisory and is polled once per frame.

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::time::Duration;

use crate::config::Config;

const NO_LAMP_LEVEL: u16 = u16::MAX;

/// Shared stream state: kill flag, active-stream marker, counters and the
/// runtime-adjustable settings a session reads when it starts.
#[derive(Debug)]
pub struct StreamContext {
    kill: AtomicBool,
    active: AtomicBool,
    streams_served: AtomicU64,
    frames_served: AtomicU64,
    auto_lamp: AtomicBool,
    lamp_level: AtomicU16,
    min_frame_time_ms: AtomicU64,
    debug_data: AtomicBool,
}

impl Default for StreamContext {
    fn default() -> Self {
        Self {
            kill: AtomicBool::new(false),
            active: AtomicBool::new(false),
            streams_served: AtomicU64::new(0),
            frames_served: AtomicU64::new(0),
            auto_lamp: AtomicBool::new(false),
            lamp_level: AtomicU16::new(NO_LAMP_LEVEL),
            min_frame_time_ms: AtomicU64::new(0),
            debug_data: AtomicBool::new(false),
        }
    }
}

impl StreamContext {
    /// Create a context with no lamp, no pacing and zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded from the stream and lamp configuration
    pub fn from_config(config: &Config) -> Self {
        let ctx = Self::new();
        ctx.set_auto_lamp(config.lamp.auto_lamp);
        ctx.set_lamp_level(config.lamp.level);
        ctx.set_min_frame_time(Duration::from_millis(config.stream.min_frame_time_ms));
        ctx.set_debug_data(config.stream.debug_data);
        ctx
    }

    /// Ask every active stream to end after its current frame.
    pub fn kill_streams(&self) {
        self.kill.store(true, Ordering::Release);
    }

    /// Whether a kill has been requested since the current session started
    pub fn kill_requested(&self) -> bool {
        self.kill.load(Ordering::Acquire)
    }

    /// Whether a stream session is currently running
    pub fn is_streaming(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Number of stream sessions that have run to completion
    pub fn streams_served(&self) -> u64 {
        self.streams_served.load(Ordering::Relaxed)
    }

    /// Number of frames fully sent across all sessions
    pub fn frames_served(&self) -> u64 {
        self.frames_served.load(Ordering::Relaxed)
    }

    pub fn auto_lamp(&self) -> bool {
        self.auto_lamp.load(Ordering::Relaxed)
    }

    pub fn set_auto_lamp(&self, enabled: bool) {
        self.auto_lamp.store(enabled, Ordering::Relaxed);
    }

    /// Configured lamp level in percent, `None` when no lamp is fitted
    pub fn lamp_level(&self) -> Option<u8> {
        match self.lamp_level.load(Ordering::Relaxed) {
            NO_LAMP_LEVEL => None,
            level => Some(level.min(100) as u8),
        }
    }

    pub fn set_lamp_level(&self, level: Option<u8>) {
        let raw = level.map_or(NO_LAMP_LEVEL, |l| u16::from(l.min(100)));
        self.lamp_level.store(raw, Ordering::Relaxed);
    }

    /// Lamp level to apply while streaming, if the lamp follows the stream.
    pub fn stream_lamp_level(&self) -> Option<u8> {
        if self.auto_lamp() { self.lamp_level() } else { None }
    }

    /// Minimum time between the starts of consecutive frames
    pub fn min_frame_time(&self) -> Duration {
        Duration::from_millis(self.min_frame_time_ms.load(Ordering::Relaxed))
    }

    pub fn set_min_frame_time(&self, interval: Duration) {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.min_frame_time_ms.store(ms, Ordering::Relaxed);
    }

    /// Whether per-frame statistics are logged
    pub fn debug_data(&self) -> bool {
        self.debug_data.load(Ordering::Relaxed)
    }

    pub fn set_debug_data(&self, enabled: bool) {
        self.debug_data.store(enabled, Ordering::Relaxed);
    }

    /// Clear the kill flag and raise the active-stream marker.
    pub(crate) fn begin_stream(&self) {
        self.kill.store(false, Ordering::Release);
        self.active.store(true, Ordering::Release);
    }

    /// Drop the active-stream marker without counting a served stream.
    pub(crate) fn abort_stream(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Count a finished stream and drop the active-stream marker.
    pub(crate) fn finish_stream(&self) {
        self.streams_served.fetch_add(1, Ordering::Relaxed);
        self.active.store(false, Ordering::Release);
    }

    pub(crate) fn record_frame(&self) {
        self.frames_served.fetch_add(1, Ordering::Relaxed);
    }
}
