//! Relays upstream completion chunks to the client as `text/event-stream`.
//!
//! Each chunk becomes one `data: <json>\n\n` frame. A clean end of the chunk
//! stream is followed by `data: [DONE]\n\n`; an upstream failure ends the body
//! with an error instead, so the connection is aborted without the sentinel.

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::llm::{ChunkStream, UpstreamError};

const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("upstream failed mid-stream: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("failed to encode chunk: {0}")]
    Encode(#[from] serde_json::Error),
}

fn encode_frame(chunk: &Value) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(chunk)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}

/// Frame `chunks` lazily: the next chunk is pulled only when the previous
/// frame has been taken by the consumer.
pub fn relay(chunks: ChunkStream) -> impl Stream<Item = Result<Bytes, StreamError>> + Send {
    stream::unfold(Some(chunks), |state| async move {
        let Some(mut chunks) = state else {
            return None;
        };
        match chunks.next().await {
            Some(Ok(chunk)) => match encode_frame(&chunk) {
                Ok(frame) => Some((Ok(frame), Some(chunks))),
                Err(e) => Some((Err(StreamError::from(e)), None)),
            },
            Some(Err(e)) => {
                error!("Upstream stream failed, aborting relay: {}", e);
                Some((Err(StreamError::from(e)), None))
            }
            None => {
                debug!("Upstream stream finished");
                Some((Ok(Bytes::from_static(DONE_FRAME)), None))
            }
        }
    })
}

/// Build the streaming HTTP response for a chat completion.
pub fn event_stream_response(chunks: ChunkStream) -> Response {
    let mut response = Body::from_stream(relay(chunks)).into_response();
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
