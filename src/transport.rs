//! Chunked HTTP response transport
//!
//! A stream session writes its response through [`Transport`]: headers first,
//! then an unbounded sequence of body chunks. [`ChunkedTransport`] is the
//! implementation used by the HTTP server. It hands chunks to the response
//! body over a channel with room for a single chunk, so a slow client
//! stalls the session (backpressure) and a departed client makes the next
//! write fail.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use std::convert::Infallible;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::{Result, StreamError};

/// Write side of a chunked HTTP response.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Set the response content type. Must be called before the first chunk.
    fn set_content_type(&mut self, content_type: &str) -> Result<()>;

    /// Set an additional response header. Must be called before the first chunk.
    fn set_header(&mut self, name: &str, value: &str) -> Result<()>;

    /// Send one body chunk, committing the headers on the first call.
    async fn send_chunk(&mut self, chunk: Bytes) -> Result<()>;
}

/// Create a connected transport / response pair.
pub fn chunked_channel() -> (ChunkedTransport, ChunkedResponse) {
    let (head_tx, head_rx) = oneshot::channel();
    let (body_tx, body_rx) = mpsc::channel(1);
    let transport = ChunkedTransport { headers: HeaderMap::new(), head: Some(head_tx), body: body_tx };
    let response = ChunkedResponse { head: head_rx, body: body_rx };
    (transport, response)
}

/// Session-side half of a chunked response
#[derive(Debug)]
pub struct ChunkedTransport {
    headers: HeaderMap,
    head: Option<oneshot::Sender<HeaderMap>>,
    body: mpsc::Sender<Bytes>,
}

impl ChunkedTransport {
    /// Whether the response side has been dropped, i.e. the client is gone.
    pub fn is_closed(&self) -> bool {
        self.body.is_closed() || self.head.as_ref().is_some_and(|head| head.is_closed())
    }

    fn ensure_uncommitted(&self) -> Result<()> {
        if self.head.is_none() {
            return Err(StreamError::transport("response headers already sent"));
        }
        Ok(())
    }

    fn commit_headers(&mut self) -> Result<()> {
        if let Some(head) = self.head.take() {
            let headers = std::mem::take(&mut self.headers);
            if head.send(headers).is_err() {
                return Err(StreamError::transport("client disconnected before headers were sent"));
            }
            debug!("Response headers committed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for ChunkedTransport {
    fn set_content_type(&mut self, content_type: &str) -> Result<()> {
        self.ensure_uncommitted()?;
        let value = HeaderValue::from_str(content_type).map_err(|e| {
            StreamError::transport_with_source("invalid content type", Box::new(e))
        })?;
        self.headers.insert(CONTENT_TYPE, value);
        Ok(())
    }

    fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.ensure_uncommitted()?;
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            StreamError::transport_with_source(format!("invalid header name {name:?}"), Box::new(e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            StreamError::transport_with_source(format!("invalid value for {name}"), Box::new(e))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    async fn send_chunk(&mut self, chunk: Bytes) -> Result<()> {
        self.commit_headers()?;
        self.body
            .send(chunk)
            .await
            .map_err(|_| StreamError::transport("client disconnected"))
    }
}

/// Server-side half of a chunked response
#[derive(Debug)]
pub struct ChunkedResponse {
    head: oneshot::Receiver<HeaderMap>,
    body: mpsc::Receiver<Bytes>,
}

impl ChunkedResponse {
    /// Wait for the session to commit its headers and turn the chunk
    /// channel into a streaming response.
    ///
    /// A session that ends before sending anything yields a bare
    /// `500 Internal Server Error`.
    pub async fn into_response(self) -> Response {
        match self.head.await {
            Ok(headers) => {
                let chunks = ReceiverStream::new(self.body).map(Ok::<Bytes, Infallible>);
                let mut response = Response::new(Body::from_stream(chunks));
                *response.headers_mut() = headers;
                response
            }
            Err(_) => {
                warn!("Stream ended before any data was sent");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
