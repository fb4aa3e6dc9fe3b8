//! MJPEG camera stream server.
//!
//! Camstream serves a live camera feed over HTTP as a
//! `multipart/x-mixed-replace` stream that browsers render as video, plus a
//! small JSON status route and an HTML error page for devices whose camera
//! failed to start.
//!
//! # Features
//!
//! - **Stream sessions**: one long-lived response per viewer, paced to a
//!   configurable minimum frame interval
//! - **Pluggable hardware**: frame sources, status LED and lamp are traits
//! - **Kill switch**: any task can end active streams at the next frame
//! - **Degraded mode**: a recorded startup error swaps `/` for an error page
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use camstream::{Config, LogIndicator, ReplaySource, server};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("camstream.yaml")?;
//!     let source = ReplaySource::open(&config.source.directory, config.source.pool_size)?;
//!     let state = server::AppState::from_config(&config, source, Arc::new(LogIndicator::new()));
//!
//!     server::serve(&config, state, CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
pub mod context;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;

// Hardware seams
pub mod clock;
pub mod indicator;
pub mod source;
pub mod sources;

// Streaming and HTTP
pub mod server;
pub mod stream;
pub mod transport;

// Core exports
pub use config::Config;
pub use context::StreamContext;
pub use error::*;
pub use types::*;

// Seam exports
pub use clock::{Clock, MonotonicClock};
pub use indicator::{Indicator, LogIndicator, Pulse};
pub use source::FrameSource;
pub use sources::{NoCamera, ReplaySource};
pub use transport::{ChunkedResponse, ChunkedTransport, Transport, chunked_channel};

// Server exports
pub use server::{AppState, DeviceInfo, build_router, serve};
pub use stream::{SessionReport, SessionState, StreamSession};
