//! Test doubles for the stream session's collaborators
//!
//! These stand in for the camera, the status LED / lamp and the HTTP
//! connection so session behaviour can be checked without hardware or
//! sockets. Each double keeps a shared log that stays readable after the
//! double itself has been moved into the code under test.

#![cfg(any(test, feature = "test-utils"))]

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::StreamContext;
use crate::indicator::{Indicator, Pulse};
use crate::source::FrameSource;
use crate::transport::Transport;
use crate::types::{Frame, FrameToken, PixelFormat};
use crate::{Result, StreamError};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Smallest byte string that passes as a JPEG
pub fn jpeg(body: &[u8]) -> Bytes {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(body);
    data.extend_from_slice(&[0xFF, 0xD9]);
    Bytes::from(data)
}

/// One scripted answer from a [`ScriptedSource`]
#[derive(Debug, Clone)]
pub enum SourceStep {
    /// Lend a JPEG frame with this payload
    Frame(Bytes),
    /// Lend a frame with a non-JPEG format tag
    NonJpeg(PixelFormat),
    /// Report that no frame is available
    Empty,
    /// Fail the acquisition
    Fail(String),
}

/// Acquire / release bookkeeping shared with a [`ScriptedSource`]
#[derive(Debug, Default)]
pub struct SourceLog {
    acquired: AtomicUsize,
    released: Mutex<Vec<u64>>,
}

impl SourceLog {
    /// Number of `acquire` calls
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Sequence numbers of released frames, in release order
    pub fn released(&self) -> Vec<u64> {
        locked(&self.released).clone()
    }
}

/// Frame source that replays a fixed script, then reports no frame.
#[derive(Debug)]
pub struct ScriptedSource {
    steps: VecDeque<SourceStep>,
    next_sequence: u64,
    log: Arc<SourceLog>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = SourceStep>) -> Self {
        Self { steps: steps.into_iter().collect(), next_sequence: 0, log: Arc::default() }
    }

    /// Script of JPEG frames with the given payloads
    pub fn frames(payloads: impl IntoIterator<Item = Bytes>) -> Self {
        Self::new(payloads.into_iter().map(SourceStep::Frame))
    }

    /// Shared log handle
    pub fn log(&self) -> Arc<SourceLog> {
        Arc::clone(&self.log)
    }

    fn lend(&mut self, format: PixelFormat, data: Bytes) -> Frame {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Frame::new(format, data, FrameToken::Pooled(0), sequence)
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    async fn acquire(&mut self) -> Result<Option<Frame>> {
        self.log.acquired.fetch_add(1, Ordering::SeqCst);
        match self.steps.pop_front() {
            Some(SourceStep::Frame(data)) => Ok(Some(self.lend(PixelFormat::Jpeg, data))),
            Some(SourceStep::NonJpeg(format)) => {
                Ok(Some(self.lend(format, Bytes::from_static(b"\x00\x01\x02\x03"))))
            }
            Some(SourceStep::Empty) | None => Ok(None),
            Some(SourceStep::Fail(reason)) => Err(StreamError::source_failed(reason)),
        }
    }

    fn release(&mut self, frame: Frame) {
        locked(&self.log.released).push(frame.sequence);
    }
}

/// Side effect observed by a [`RecordingIndicator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorEvent {
    Signal(Pulse),
    Lamp(u8),
}

/// Indicator that records every side effect
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    events: Mutex<Vec<IndicatorEvent>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IndicatorEvent> {
        locked(&self.events).clone()
    }

    /// Lamp levels set, in order
    pub fn lamp_levels(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                IndicatorEvent::Lamp(level) => Some(level),
                IndicatorEvent::Signal(_) => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl Indicator for RecordingIndicator {
    async fn signal(&self, pulse: Pulse) {
        locked(&self.events).push(IndicatorEvent::Signal(pulse));
    }

    fn set_lamp(&self, level: u8) {
        locked(&self.events).push(IndicatorEvent::Lamp(level));
    }
}

/// Transport that keeps everything written to it.
///
/// Failures can be injected on the content type or on the n-th chunk, and
/// a kill can be requested on a [`StreamContext`] once a given number of
/// chunks has gone out.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub chunks: Vec<Bytes>,
    fail_content_type: bool,
    fail_at_chunk: Option<usize>,
    kill_after: Option<(usize, Arc<StreamContext>)>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the content type
    pub fn failing_content_type(mut self) -> Self {
        self.fail_content_type = true;
        self
    }

    /// Fail the chunk with this zero-based index, and every one after it
    pub fn failing_at_chunk(mut self, index: usize) -> Self {
        self.fail_at_chunk = Some(index);
        self
    }

    /// Request a kill once `chunks` chunks have been accepted
    pub fn killing_after(mut self, chunks: usize, ctx: Arc<StreamContext>) -> Self {
        self.kill_after = Some((chunks, ctx));
        self
    }

    /// Value of a recorded header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    fn set_content_type(&mut self, content_type: &str) -> Result<()> {
        if self.fail_content_type {
            return Err(StreamError::transport("content type rejected"));
        }
        self.content_type = Some(content_type.to_string());
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: Bytes) -> Result<()> {
        if self.fail_at_chunk.is_some_and(|index| self.chunks.len() >= index) {
            return Err(StreamError::transport("connection reset"));
        }
        self.chunks.push(chunk);
        if let Some((after, ctx)) = &self.kill_after {
            if self.chunks.len() == *after {
                ctx.kill_streams();
            }
        }
        Ok(())
    }
}
