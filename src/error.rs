//! Error types for the camera stream server.
//!
//! Every failure a stream session can observe is fatal to that session: the
//! first transport or frame-source failure ends the loop and nothing is
//! retried. The remaining variants cover server startup (configuration,
//! binding, route registration) where a caller may choose to try again.
//!
//! ## Error Categories
//!
//! - **Transport Errors**: response headers rejected, chunk writes failed, client gone
//! - **Source Errors**: no frame available, non-JPEG frame, buffer pool misuse
//! - **Server Errors**: invalid configuration, bind and accept failures, route limits
//!
//! ## Recovery
//!
//! ```rust
//! use camstream::StreamError;
//!
//! let error = StreamError::transport("client disconnected");
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::PixelFormat;

/// Result type alias for stream server operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for stream server operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Frame source has no frame available")]
    SourceExhausted,

    #[error("Frame source returned a {format} frame, expected JPEG")]
    FormatMismatch { format: PixelFormat },

    #[error("Frame source error: {reason}")]
    Source { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to bind stream server to {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream server on {addr} failed")]
    Serve {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Route table needs {required} routes but only {max} may be registered")]
    RouteLimit { required: usize, max: usize },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Stream sessions never retry; only startup failures tied to the host
    /// (busy ports, missing files) are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { .. } => false,
            StreamError::SourceExhausted => false,
            StreamError::FormatMismatch { .. } => false,
            StreamError::Source { .. } => false,
            StreamError::Config { .. } => false,
            StreamError::Io { .. } => true,
            StreamError::Bind { .. } => true,
            StreamError::Serve { .. } => true,
            StreamError::RouteLimit { .. } => false,
        }
    }

    /// Returns whether this error ends an active stream session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            StreamError::Transport { .. }
                | StreamError::SourceExhausted
                | StreamError::FormatMismatch { .. }
                | StreamError::Source { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::Transport { .. } => vec![
                "Reconnect the viewer to start a new stream",
                "Check network link quality to the device",
            ],
            StreamError::SourceExhausted => vec![
                "Check the camera sensor is connected and initialised",
                "Increase the frame buffer pool size",
            ],
            StreamError::FormatMismatch { .. } => vec![
                "Configure the camera pipeline for JPEG output",
                "Remove non-JPEG files from the replay directory",
            ],
            StreamError::Source { .. } => vec![
                "Return every frame before acquiring the next one",
                "Verify the frame source directory is readable",
            ],
            StreamError::Config { .. } => vec![
                "Check the configuration file against the documented keys",
                "Verify numeric ranges such as lamp level and pool size",
            ],
            StreamError::Io { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
            StreamError::Bind { .. } => vec![
                "Check no other process is listening on the stream port",
                "Choose a different port in the configuration",
            ],
            StreamError::Serve { .. } => vec![
                "Check the host's file descriptor limits",
                "Restart the stream server",
            ],
            StreamError::RouteLimit { .. } => vec![
                "Raise server.max_routes in the configuration",
            ],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        StreamError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for frame source errors.
    pub fn source_failed(reason: impl Into<String>) -> Self {
        StreamError::Source { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        StreamError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn io_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::Io { path, source }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io { path: PathBuf::from("<unknown>"), source: err }
    }
}
