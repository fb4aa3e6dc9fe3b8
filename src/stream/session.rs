//! Stream session: one viewer's MJPEG stream from start to teardown
//!
//! ```text
//!   Init ──► Streaming ──► EndedClean   (kill flag observed)
//!    │           │
//!    │           └───────► EndedError   (send failed, no frame, non-JPEG)
//!    └───────────────────► EndedError   (headers rejected)
//! ```
//!
//! Each loop iteration acquires one frame, writes it as three chunks,
//! releases the frame, checks for an exit, then paces. The first failure
//! ends the session; nothing is retried. A transport or source failure in
//! the same iteration as a kill request is reported as an error.

use tracing::{debug, info, warn};

use super::multipart::{self, MultipartChunk, STREAM_CONTENT_TYPE};
use super::pacer::FramePacer;
use crate::clock::Clock;
use crate::context::StreamContext;
use crate::indicator::{Indicator, Pulse};
use crate::source::FrameSource;
use crate::transport::Transport;
use crate::types::Frame;
use crate::{Result, StreamError};

/// Header allowing any origin to embed the stream
pub const ALLOW_ORIGIN_HEADER: &str = "Access-Control-Allow-Origin";

/// Lifecycle state of a [`StreamSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Streaming,
    EndedClean,
    EndedError,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::EndedClean | SessionState::EndedError)
    }
}

/// Summary of a session that ended cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Frames fully written to the transport
    pub frames_sent: u64,
}

/// One client's stream.
///
/// Borrows the shared context and side-channel for its lifetime; the frame
/// source and the transport are lent to [`run`](StreamSession::run).
pub struct StreamSession<'a> {
    ctx: &'a StreamContext,
    indicator: &'a dyn Indicator,
    clock: &'a dyn Clock,
    pacer: FramePacer,
    state: SessionState,
    lamp_level: Option<u8>,
    frames_sent: u64,
}

impl<'a> StreamSession<'a> {
    /// Create a session. The minimum frame interval is read from `ctx` now.
    pub fn new(ctx: &'a StreamContext, indicator: &'a dyn Indicator, clock: &'a dyn Clock) -> Self {
        Self {
            ctx,
            indicator,
            clock,
            pacer: FramePacer::new(ctx.min_frame_time()),
            state: SessionState::Init,
            lamp_level: None,
            frames_sent: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    /// Run the stream until the client goes away, the source fails or a
    /// kill is requested.
    ///
    /// Returns `Ok` for a killed (clean) stream and the first fatal error
    /// otherwise. Every acquired frame has been released when this returns.
    pub async fn run<S, T>(&mut self, source: &mut S, transport: &mut T) -> Result<SessionReport>
    where
        S: FrameSource + ?Sized,
        T: Transport + ?Sized,
    {
        if self.state != SessionState::Init {
            return Err(StreamError::transport("stream session already used"));
        }

        info!("Stream requested");
        self.begin().await;

        if let Err(e) = Self::write_head(transport) {
            warn!(error = %e, "STREAM: failed to set HTTP response headers");
            self.ctx.abort_stream();
            self.revert_lamp();
            self.pacer.reset();
            self.state = SessionState::EndedError;
            return Err(e);
        }

        self.state = SessionState::Streaming;
        let result = match transport.send_chunk(multipart::stream_boundary()).await {
            Ok(()) => self.stream_frames(source, transport).await,
            Err(e) => Err(e),
        };

        self.teardown(&result);
        result.map(|()| SessionReport { frames_sent: self.frames_sent })
    }

    async fn begin(&mut self) {
        self.ctx.begin_stream();
        self.lamp_level = self.ctx.stream_lamp_level();
        if let Some(level) = self.lamp_level {
            self.indicator.set_lamp(level);
        }
        self.indicator.signal(Pulse::DoubleFlash).await;
        self.pacer.start(self.clock.now_micros());
    }

    fn write_head<T: Transport + ?Sized>(transport: &mut T) -> Result<()> {
        transport.set_content_type(STREAM_CONTENT_TYPE)?;
        transport.set_header(ALLOW_ORIGIN_HEADER, "*")
    }

    async fn stream_frames<S, T>(&mut self, source: &mut S, transport: &mut T) -> Result<()>
    where
        S: FrameSource + ?Sized,
        T: Transport + ?Sized,
    {
        loop {
            let frame_len = match source.acquire().await {
                Ok(Some(frame)) => {
                    let len = frame.len();
                    let sent = Self::send_frame(transport, &frame).await;
                    source.release(frame);
                    sent.map(|()| len)
                }
                Ok(None) => Err(StreamError::SourceExhausted),
                Err(e) => Err(e),
            };

            let frame_len = match frame_len {
                Ok(len) => len,
                Err(e) => {
                    warn!(error = %e, frames = self.frames_sent, "Stream failed");
                    return Err(e);
                }
            };
            self.frames_sent += 1;
            self.ctx.record_frame();

            if self.ctx.kill_requested() {
                info!(frames = self.frames_sent, "Stream killed");
                return Ok(());
            }

            self.pace(frame_len).await;
        }
    }

    async fn send_frame<T: Transport + ?Sized>(transport: &mut T, frame: &Frame) -> Result<()> {
        if !frame.is_jpeg() {
            return Err(StreamError::FormatMismatch { format: frame.format });
        }
        for chunk in MultipartChunk::for_payload(frame.data.clone()).into_parts() {
            transport.send_chunk(chunk).await?;
        }
        Ok(())
    }

    async fn pace(&mut self, frame_len: usize) {
        let frame_time = self.pacer.elapsed_ms(self.clock.now_micros());
        let delay = self.pacer.delay_for(frame_time);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.ctx.debug_data() {
            let delay_ms = delay.as_millis() as u64;
            let total_ms = (frame_time + delay_ms).max(1);
            debug!(
                bytes = frame_len,
                frame_ms = frame_time,
                delay_ms,
                fps = format_args!("{:.1}", 1000.0 / total_ms as f64),
                "MJPG frame"
            );
        }

        self.pacer.mark(self.clock.now_micros());
    }

    fn teardown(&mut self, result: &Result<()>) {
        self.ctx.finish_stream();
        self.revert_lamp();
        self.pacer.reset();
        self.state = match result {
            Ok(()) => SessionState::EndedClean,
            Err(_) => SessionState::EndedError,
        };
        info!(frames = self.frames_sent, streams_served = self.ctx.streams_served(), "Stream ended");
    }

    fn revert_lamp(&self) {
        if self.lamp_level.is_some() {
            self.indicator.set_lamp(0);
        }
    }
}
