//! HTTP server: route registration and lifecycle
//!
//! Two routes are registered. `/info` always reports the device name and
//! stream URL. `/` is bound once, at registration, to either the MJPEG
//! stream or the error page, depending on whether a critical startup
//! error was recorded.

pub mod handlers;
pub mod template;

use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::config::{Config, REGISTERED_ROUTES};
use crate::context::StreamContext;
use crate::indicator::Indicator;
use crate::source::FrameSource;
use crate::{Result, StreamError};

pub use handlers::CameraInfo;
pub use template::ErrorPage;

/// Frame source shared by stream sessions; one session holds it at a time
pub type SharedSource = Arc<Mutex<Box<dyn FrameSource>>>;

/// Identity and health reported by the HTTP routes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub cam_name: String,
    pub stream_url: String,
    pub app_url: Option<String>,
    pub critical_error: Option<String>,
}

impl DeviceInfo {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cam_name: config.cam_name.clone(),
            stream_url: config.stream_url(),
            app_url: config.app_url.clone(),
            critical_error: config.critical_error().map(str::to_string),
        }
    }

    /// Whether `/` serves the error page
    pub fn is_degraded(&self) -> bool {
        self.critical_error.as_deref().is_some_and(|message| !message.is_empty())
    }
}

/// State shared by every route handler
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<StreamContext>,
    pub(crate) source: SharedSource,
    pub(crate) indicator: Arc<dyn Indicator>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) device: Arc<DeviceInfo>,
    pub(crate) shutdown: CancellationToken,
}

impl AppState {
    pub fn new<S>(
        ctx: Arc<StreamContext>,
        source: S,
        indicator: Arc<dyn Indicator>,
        device: DeviceInfo,
    ) -> Self
    where
        S: FrameSource,
    {
        Self {
            ctx,
            source: Arc::new(Mutex::new(Box::new(source))),
            indicator,
            clock: Arc::new(MonotonicClock::new()),
            device: Arc::new(device),
            shutdown: CancellationToken::new(),
        }
    }

    /// Build state from configuration with a fresh [`StreamContext`]
    pub fn from_config<S>(config: &Config, source: S, indicator: Arc<dyn Indicator>) -> Self
    where
        S: FrameSource,
    {
        let ctx = Arc::new(StreamContext::from_config(config));
        Self::new(ctx, source, indicator, DeviceInfo::from_config(config))
    }

    /// Replace the pacing clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use `shutdown` as the server shutdown signal. Once it is cancelled no
    /// new stream session starts and running ones are killed.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ctx", &self.ctx)
            .field("device", &self.device)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Register the server's routes.
///
/// Fails with [`StreamError::RouteLimit`] when the route table would exceed
/// `max_routes`.
pub fn build_router(state: AppState, max_routes: usize) -> Result<Router> {
    if REGISTERED_ROUTES > max_routes {
        return Err(StreamError::RouteLimit { required: REGISTERED_ROUTES, max: max_routes });
    }

    let root = if state.device.is_degraded() {
        warn!(
            error = state.device.critical_error.as_deref().unwrap_or_default(),
            "Critical error recorded, serving error page on /"
        );
        get(handlers::error_page)
    } else {
        get(handlers::stream)
    };

    Ok(Router::new()
        .route("/", root)
        .route("/info", get(handlers::info))
        .with_state(state))
}

/// Bind the configured address and serve until `shutdown` is cancelled.
pub async fn serve(config: &Config, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let addr = config.server.socket_addr();
    let state = state.with_shutdown(shutdown);
    let router = build_router(state.clone(), config.server.max_routes)?;

    info!("Starting stream server on port: '{}'", addr.port());
    let listener =
        TcpListener::bind(addr).await.map_err(|source| StreamError::Bind { addr, source })?;

    serve_listener(listener, router, &state).await
}

/// Serve `router`, built from `state`, on an already bound listener.
///
/// Cancelling the state's shutdown token stops accepting connections and
/// requests a kill, so an active stream ends after its current frame.
pub async fn serve_listener(listener: TcpListener, router: Router, state: &AppState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Stream server listening");

    let ctx = Arc::clone(&state.ctx);
    let shutdown = state.shutdown_token();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Shutting down stream server");
            ctx.kill_streams();
        })
        .await
        .map_err(|source| StreamError::Serve { addr, source })?;

    info!("Stream server stopped");
    Ok(())
}
