//! Response handling and transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from upstream responses
//! - Stage the upstream body through a bounded chunk queue
//! - Enforce the read timeout between body chunks
//! - Stop reading the upstream as soon as the client goes away
//!
//! # Design Decisions
//! - Chunks are at most `buffer_size` bytes and at most `buffer_count` of
//!   them wait for the client; a full queue pauses the upstream read, so a
//!   large body degrades to plain streaming instead of growing memory
//! - A stall or upstream error after headers were sent ends the client
//!   body with an error, which aborts the connection; the response is
//!   never passed off as complete

use std::time::Duration;

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures_util::stream;
use http_body_util::BodyExt;
use hyper::body::Body as HttpBody;
use tokio::sync::mpsc;

use crate::routing::BufferPolicy;
use crate::security::headers::strip_hop_by_hop;

/// Failure while relaying an upstream body.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("upstream sent nothing for {0:?}")]
    Stalled(Duration),
    #[error("upstream body failed: {0}")]
    Upstream(String),
}

/// Turn an upstream response into the client response.
pub fn relay<B>(response: hyper::Response<B>, buffers: BufferPolicy, read_timeout: Duration) -> Response
where
    B: HttpBody<Data = Bytes> + Send + Unpin + 'static,
    B::Error: std::fmt::Display + Send,
{
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, relay_body(body, buffers, read_timeout))
}

/// Pump `body` into a bounded queue drained by the returned client body.
pub fn relay_body<B>(mut body: B, buffers: BufferPolicy, read_timeout: Duration) -> Body
where
    B: HttpBody<Data = Bytes> + Send + Unpin + 'static,
    B::Error: std::fmt::Display + Send,
{
    let chunk_size = buffers.size.max(1);
    let (tx, rx) = mpsc::channel::<Result<Bytes, StreamError>>(buffers.count.max(1));

    tokio::spawn(async move {
        loop {
            let next = tokio::select! {
                _ = tx.closed() => {
                    tracing::debug!("Client went away, dropping upstream body");
                    return;
                }
                next = tokio::time::timeout(read_timeout, body.frame()) => next,
            };

            let frame = match next {
                Ok(Some(Ok(frame))) => frame,
                Ok(None) => return,
                Ok(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Upstream body failed mid-response");
                    let _ = tx.send(Err(StreamError::Upstream(e.to_string()))).await;
                    return;
                }
                Err(_) => {
                    tracing::warn!(timeout = ?read_timeout, "Upstream stalled mid-response");
                    let _ = tx.send(Err(StreamError::Stalled(read_timeout))).await;
                    return;
                }
            };

            // Trailers are not relayed.
            let Ok(mut data) = frame.into_data() else {
                continue;
            };
            while !data.is_empty() {
                let chunk = data.split_to(data.len().min(chunk_size));
                if tx.send(Ok(chunk)).await.is_err() {
                    tracing::debug!("Client went away, dropping upstream body");
                    return;
                }
            }
        }
    });

    Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}
