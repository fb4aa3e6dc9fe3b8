//! HTTP surface tests: route wiring, status JSON, error page and stream
//! responses driven through the router.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use bytes::{Bytes, BytesMut};
use camstream::server::{AppState, DeviceInfo, build_router, serve_listener};
use camstream::stream::{MultipartChunk, STREAM_BOUNDARY, STREAM_CONTENT_TYPE};
use camstream::test_utils::{IndicatorEvent, RecordingIndicator, ScriptedSource, jpeg};
use camstream::{FrameSource, Pulse, ReplaySource, StreamContext, StreamError};
use futures::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tower::ServiceExt;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    ctx: Arc<StreamContext>,
    indicator: Arc<RecordingIndicator>,
    state: AppState,
    router: Router,
}

fn harness<S: FrameSource>(source: S, device: DeviceInfo) -> Harness {
    let ctx = Arc::new(StreamContext::new());
    let indicator = Arc::new(RecordingIndicator::new());
    let state = AppState::new(Arc::clone(&ctx), source, indicator.clone(), device);
    let router = build_router(state.clone(), 16).unwrap();
    Harness { ctx, indicator, state, router }
}

/// Serve `h` on an ephemeral local port
async fn listen(h: &Harness) -> (SocketAddr, JoinHandle<camstream::Result<()>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = h.router.clone();
    let state = h.state.clone();
    let server = tokio::spawn(async move { serve_listener(listener, router, &state).await });
    (addr, server)
}

/// Send a `GET` and read the whole reply on a background task
async fn request(addr: SocketAddr, path: &str) -> JoinHandle<String> {
    let mut conn = TcpStream::connect(addr).await.unwrap();
    let head = format!("GET {path} HTTP/1.1\r\nHost: camstream\r\nConnection: close\r\n\r\n");
    conn.write_all(head.as_bytes()).await.unwrap();
    tokio::spawn(async move {
        let mut reply = Vec::new();
        conn.read_to_end(&mut reply).await.unwrap();
        String::from_utf8_lossy(&reply).into_owned()
    })
}

fn device(cam_name: &str) -> DeviceInfo {
    DeviceInfo {
        cam_name: cam_name.to_string(),
        stream_url: "http://192.168.4.1:81/".to_string(),
        ..DeviceInfo::default()
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn wait_until_idle(ctx: &StreamContext) {
    tokio::time::timeout(WAIT, async {
        while ctx.is_streaming() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("stream session did not end");
}

#[tokio::test]
async fn info_reports_name_and_stream_url() {
    let h = harness(ScriptedSource::new([]), device("Front door"));

    let response = h.router.oneshot(get("/info")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["cam_name"], "Front door");
    assert_eq!(object["stream_url"], "http://192.168.4.1:81/");
}

#[tokio::test]
async fn info_escapes_quotes_in_device_name() {
    let h = harness(ScriptedSource::new([]), device(r#"Cam "A" \ B"#));

    let response = h.router.oneshot(get("/info")).await.unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["cam_name"], r#"Cam "A" \ B"#);
}

#[tokio::test]
async fn degraded_mode_serves_error_page_on_root() {
    let device = DeviceInfo {
        critical_error: Some("Camera init failed".to_string()),
        app_url: Some("http://192.168.4.1/".to_string()),
        ..device("Porch")
    };
    let h = harness(ScriptedSource::new([]), device);

    let response = h.router.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(response.headers()[header::CONTENT_ENCODING], "identity");

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Porch"));
    assert!(html.contains("Camera init failed"));
    assert!(html.contains("http://192.168.4.1/"));
    assert!(!html.contains("<CAMNAME>"));
    assert!(!html.contains("<ERRORTEXT>"));
    assert!(!html.contains("<APPURL>"));

    assert_eq!(h.indicator.events(), vec![IndicatorEvent::Signal(Pulse::Flash)]);
    assert_eq!(h.ctx.streams_served(), 0);

    let response = h.router.oneshot(get("/info")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stream_body_carries_every_frame_in_order() {
    let source = ScriptedSource::frames([jpeg(b"one"), jpeg(b"two")]);
    let log = source.log();
    let h = harness(source, device("Cam"));

    let response = h.router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], STREAM_CONTENT_TYPE);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    // The script runs dry after two frames, which ends the session.
    let body = tokio::time::timeout(WAIT, to_bytes(response.into_body(), usize::MAX))
        .await
        .unwrap()
        .unwrap();

    let mut expected = BytesMut::from(STREAM_BOUNDARY.as_bytes());
    for payload in [jpeg(b"one"), jpeg(b"two")] {
        for part in MultipartChunk::for_payload(payload).into_parts() {
            expected.extend_from_slice(&part);
        }
    }
    assert_eq!(body, expected.freeze());

    wait_until_idle(&h.ctx).await;
    assert_eq!(log.released(), vec![0, 1]);
    assert_eq!(h.ctx.streams_served(), 1);
    assert_eq!(h.ctx.frames_served(), 2);
}

#[tokio::test]
async fn client_disconnect_ends_the_session() {
    let source = ReplaySource::from_jpegs([jpeg(b"loop")], 1).unwrap();
    let h = harness(source, device("Cam"));

    let response = h.router.oneshot(get("/")).await.unwrap();
    let mut body = response.into_body().into_data_stream();

    let first = body.next().await.unwrap().unwrap();
    assert_eq!(first, Bytes::from_static(STREAM_BOUNDARY.as_bytes()));
    assert!(h.ctx.is_streaming());

    drop(body);
    wait_until_idle(&h.ctx).await;
    assert_eq!(h.ctx.streams_served(), 1);
}

#[tokio::test]
async fn kill_ends_an_active_stream() {
    let source = ReplaySource::from_jpegs([jpeg(b"loop")], 1).unwrap();
    let h = harness(source, device("Cam"));

    let response = h.router.oneshot(get("/")).await.unwrap();
    let mut body = response.into_body().into_data_stream();
    body.next().await.unwrap().unwrap();

    h.ctx.kill_streams();
    tokio::time::timeout(WAIT, async { while body.next().await.is_some() {} })
        .await
        .expect("body did not end after kill");

    wait_until_idle(&h.ctx).await;
    assert_eq!(h.ctx.streams_served(), 1);
    assert!(h.ctx.kill_requested());
}

#[tokio::test]
async fn route_limit_below_registered_routes_fails() {
    let state = AppState::new(
        Arc::new(StreamContext::new()),
        ScriptedSource::new([]),
        Arc::new(RecordingIndicator::new()),
        device("Cam"),
    );
    let err = build_router(state, 1).unwrap_err();
    assert!(matches!(err, StreamError::RouteLimit { required: 2, max: 1 }));
}

#[tokio::test]
async fn listener_serves_until_shutdown() {
    let h = harness(ScriptedSource::new([]), device("Bench"));
    let (addr, server) = listen(&h).await;

    let reply = tokio::time::timeout(WAIT, request(addr, "/info").await).await.unwrap().unwrap();
    assert!(reply.starts_with("HTTP/1.1 200 OK"));
    assert!(reply.contains(r#""cam_name":"Bench""#));

    h.state.shutdown_token().cancel();
    tokio::time::timeout(WAIT, server).await.unwrap().unwrap().unwrap();
    assert!(h.ctx.kill_requested());
}

#[tokio::test]
async fn shutdown_ends_active_and_queued_viewers() {
    let source = ReplaySource::from_jpegs([jpeg(b"loop")], 1).unwrap();
    let h = harness(source, device("Cam"));
    let (addr, server) = listen(&h).await;

    let first = request(addr, "/").await;
    tokio::time::timeout(WAIT, async {
        while !h.ctx.is_streaming() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first viewer never started streaming");

    // Queued behind the first viewer on the frame source.
    let second = request(addr, "/").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    h.state.shutdown_token().cancel();
    tokio::time::timeout(WAIT, server)
        .await
        .expect("server did not stop after shutdown")
        .unwrap()
        .unwrap();

    let first = tokio::time::timeout(WAIT, first).await.unwrap().unwrap();
    assert!(first.starts_with("HTTP/1.1 200 OK"));
    let second = tokio::time::timeout(WAIT, second).await.unwrap().unwrap();
    assert!(second.starts_with("HTTP/1.1 500"));

    assert!(!h.ctx.is_streaming());
    assert_eq!(h.ctx.streams_served(), 1);
}

#[tokio::test]
async fn viewer_leaving_the_queue_gets_no_session() {
    let source = ReplaySource::from_jpegs([jpeg(b"loop")], 1).unwrap();
    let h = harness(source, device("Cam"));
    h.ctx.set_auto_lamp(true);
    h.ctx.set_lamp_level(Some(50));

    let response = h.router.clone().oneshot(get("/")).await.unwrap();
    let mut body = response.into_body().into_data_stream();
    body.next().await.unwrap().unwrap();

    let queued = tokio::spawn(h.router.clone().oneshot(get("/")));
    tokio::time::sleep(Duration::from_millis(20)).await;
    queued.abort();
    assert!(queued.await.unwrap_err().is_cancelled());

    h.ctx.kill_streams();
    tokio::time::timeout(WAIT, async { while body.next().await.is_some() {} })
        .await
        .expect("body did not end after kill");
    wait_until_idle(&h.ctx).await;

    // Give the queued task time to take the source lock and bail out.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!h.ctx.is_streaming());
    assert!(h.ctx.kill_requested());
    assert_eq!(h.ctx.streams_served(), 1);
    assert_eq!(h.indicator.lamp_levels(), vec![50, 0]);
}
