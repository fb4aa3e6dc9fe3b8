//! Server configuration
//!
//! Configuration is read from YAML. Every key is optional; missing keys
//! take the defaults below.
//!
//! ```yaml
//! cam_name: Front door
//! stream_url: http://192.168.4.1:81/
//! app_url: http://192.168.4.1/
//! server:
//!   bind_address: 0.0.0.0
//!   port: 81
//!   max_routes: 16
//! stream:
//!   min_frame_time_ms: 100
//!   debug_data: false
//! lamp:
//!   auto_lamp: true
//!   level: 60
//! source:
//!   directory: frames
//!   pool_size: 2
//!   capture_fps: 15
//! ```
//!
//! Setting `critical_error` puts the server in degraded mode: `/` serves the
//! error page instead of the stream.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{Result, StreamError};

/// Routes the stream server registers: `/` and `/info`
pub const REGISTERED_ROUTES: usize = 2;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Device name shown on the error page and reported by `/info`
    pub cam_name: String,
    /// Public stream URL reported by `/info`; derived from the port when empty
    pub stream_url: String,
    /// Link substituted into the error page's `<APPURL>` token
    pub app_url: Option<String>,
    /// Startup failure message; selects the error page for `/`
    pub critical_error: Option<String>,
    pub server: ServerConfig,
    pub stream: StreamConfig,
    pub lamp: LampConfig,
    pub source: SourceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cam_name: "camstream".to_string(),
            stream_url: String::new(),
            app_url: None,
            critical_error: None,
            server: ServerConfig::default(),
            stream: StreamConfig::default(),
            lamp: LampConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    /// Control port; only meaningful when equal to `port`
    pub control_port: Option<u16>,
    /// Upper bound on registered routes
    pub max_routes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 81,
            control_port: None,
            max_routes: 16,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Control port, defaulting to the listening port
    pub fn control_port(&self) -> u16 {
        self.control_port.unwrap_or(self.port)
    }
}

/// Stream pacing and diagnostics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Minimum milliseconds between frames (0 = as fast as the camera allows)
    pub min_frame_time_ms: u64,
    /// Log per-frame size, timing and frame rate
    pub debug_data: bool,
}

/// Illumination lamp behaviour
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LampConfig {
    /// Switch the lamp on for the duration of each stream
    pub auto_lamp: bool,
    /// Lamp level in percent; `None` when no lamp is fitted
    pub level: Option<u8>,
}

/// Replay frame source settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory of JPEG stills to cycle through
    pub directory: PathBuf,
    /// Frame buffers available for lending
    pub pool_size: usize,
    /// Emulated sensor frame rate; unlimited when absent
    pub capture_fps: Option<u32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("frames"), pool_size: 2, capture_fps: None }
    }
}

impl Config {
    /// Parse configuration from a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml_ng::from_str(yaml)
            .map_err(|e| StreamError::config(format!("YAML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamError::io_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check value ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.cam_name.trim().is_empty() {
            return Err(StreamError::config("cam_name must not be empty"));
        }
        if let Some(level) = self.lamp.level {
            if level > 100 {
                return Err(StreamError::config(format!(
                    "lamp.level must be 0..=100, got {level}"
                )));
            }
        }
        if self.server.max_routes < REGISTERED_ROUTES {
            return Err(StreamError::RouteLimit {
                required: REGISTERED_ROUTES,
                max: self.server.max_routes,
            });
        }
        if self.source.pool_size == 0 {
            return Err(StreamError::config("source.pool_size must be at least 1"));
        }
        if self.source.capture_fps == Some(0) {
            return Err(StreamError::config("source.capture_fps must be positive"));
        }
        if self.server.control_port() != self.server.port {
            warn!(
                port = self.server.port,
                control_port = self.server.control_port(),
                "Control port differs from stream port; control requests use the stream port"
            );
        }
        Ok(())
    }

    /// Critical error message, if one was recorded
    pub fn critical_error(&self) -> Option<&str> {
        self.critical_error.as_deref().filter(|message| !message.is_empty())
    }

    /// Stream URL reported to clients
    pub fn stream_url(&self) -> String {
        if !self.stream_url.is_empty() {
            return self.stream_url.clone();
        }
        let host = match self.server.bind_address {
            ip if ip.is_unspecified() => "localhost".to_string(),
            IpAddr::V6(ip) => format!("[{ip}]"),
            IpAddr::V4(ip) => ip.to_string(),
        };
        format!("http://{}:{}/", host, self.server.port)
    }
}
