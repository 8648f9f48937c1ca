//! Request body limits.
//!
//! # Responsibilities
//! - Enforce the route's maximum request body size
//!
//! # Design Decisions
//! - A declared Content-Length over the limit is rejected before any
//!   upstream connection is opened
//! - A declared length within the limit streams through, still capped at
//!   the limit
//! - A body of unknown length is staged up to the limit so the verdict is
//!   known before forwarding
//! - Violations return 413 Payload Too Large

use axum::body::Body;
use axum::http::{header, HeaderMap};
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::error::RelayError;

/// Length declared by the client, if any and well-formed.
pub fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Apply `limit` to a request body, returning the body to forward.
pub async fn limit_body(body: Body, headers: &HeaderMap, limit: Option<u64>) -> Result<Body, RelayError> {
    let Some(limit) = limit else {
        return Ok(body);
    };

    let cap = usize::try_from(limit).unwrap_or(usize::MAX);

    if let Some(declared) = declared_length(headers) {
        if declared > limit {
            return Err(RelayError::PayloadTooLarge { limit });
        }
        return Ok(Body::new(Limited::new(body, cap)));
    }

    match Limited::new(body, cap).collect().await {
        Ok(collected) => Ok(Body::from(collected.to_bytes())),
        Err(e) if e.is::<LengthLimitError>() => Err(RelayError::PayloadTooLarge { limit }),
        Err(e) => Err(RelayError::Internal(format!("reading request body: {}", e))),
    }
}
