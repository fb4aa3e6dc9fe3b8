//! Route handlers

use axum::Json;
use axum::extract::State;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_ENCODING, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::AppState;
use super::template::ErrorPage;
use crate::Result;
use crate::context::StreamContext;
use crate::indicator::Pulse;
use crate::stream::{SessionReport, StreamSession};
use crate::transport::chunked_channel;

/// Body of `GET /info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraInfo {
    pub cam_name: String,
    pub stream_url: String,
}

/// `GET /` in normal mode: an MJPEG stream that runs until the client
/// leaves, a frame cannot be delivered, or streams are killed.
///
/// The session runs on its own task and feeds the response body through
/// a single-chunk channel. Sessions are serialised on the frame source lock.
/// A viewer that left while queued, or one dequeued after shutdown began,
/// gets no session.
pub async fn stream(State(state): State<AppState>) -> Response {
    let (mut transport, response) = chunked_channel();
    let shared_source = Arc::clone(&state.source);

    tokio::spawn(async move {
        let mut source = shared_source.lock().await;
        if state.shutdown.is_cancelled() {
            debug!("Server shutting down, stream not started");
            return;
        }
        if transport.is_closed() {
            debug!("Viewer left before the stream started");
            return;
        }

        let mut session =
            StreamSession::new(&state.ctx, state.indicator.as_ref(), state.clock.as_ref());
        // The session clears the kill flag as it starts, so it is polled first.
        let result = tokio::select! {
            biased;
            result = session.run(&mut **source, &mut transport) => result,
            result = kill_on_shutdown(&state.ctx, &state.shutdown) => result,
        };

        match result {
            Ok(report) => info!(frames = report.frames_sent, "Stream stopped on request"),
            Err(e) if e.is_session_fatal() => {
                debug!(error = %e, state = ?session.state(), "Stream session ended")
            }
            Err(e) => warn!(error = %e, "Stream session failed"),
        }
    });

    response.into_response().await
}

/// Request a kill once `shutdown` fires, then wait for the session to
/// observe it. Never completes.
async fn kill_on_shutdown(
    ctx: &StreamContext,
    shutdown: &CancellationToken,
) -> Result<SessionReport> {
    shutdown.cancelled().await;
    ctx.kill_streams();
    std::future::pending().await
}

/// `GET /info`: device name and stream URL as JSON
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    let body = CameraInfo {
        cam_name: state.device.cam_name.clone(),
        stream_url: state.device.stream_url.clone(),
    };
    ([(ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(body))
}

/// `GET /` in degraded mode: the error page with the startup failure
pub async fn error_page(State(state): State<AppState>) -> impl IntoResponse {
    state.indicator.signal(Pulse::Flash).await;
    info!("Sending error page");

    let device = &state.device;
    let html = ErrorPage {
        cam_name: &device.cam_name,
        error_text: device.critical_error.as_deref().unwrap_or_default(),
        app_url: device.app_url.as_deref(),
    }
    .render();

    ([(CONTENT_TYPE, "text/html"), (CONTENT_ENCODING, "identity")], html)
}
