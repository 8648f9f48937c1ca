//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap the upstream exchange with the route's read timeout
//! - Classify upstream failures into gateway errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; dropping the future cancels the
//!   upstream request and releases its connection
//! - Timed-out requests return 504 Gateway Timeout, everything else 502
//! - No retry: the first failure is the answer

use std::future::Future;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::Response;

use crate::error::RelayError;
use crate::observability::metrics;

/// Wait for upstream response headers for at most `limit`.
pub async fn await_upstream<F>(exchange: F, limit: Duration, upstream: &str) -> Result<Response<Incoming>, RelayError>
where
    F: Future<Output = Result<Response<Incoming>, hyper_util::client::legacy::Error>>,
{
    match tokio::time::timeout(limit, exchange).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(e)) => {
            let kind = if e.is_connect() { "connect" } else { "exchange" };
            metrics::record_upstream_error(upstream, kind);
            Err(RelayError::BadGateway(format!("{} ({}): {}", upstream, kind, error_chain(&e))))
        }
        Err(_) => {
            metrics::record_upstream_error(upstream, "timeout");
            Err(RelayError::GatewayTimeout(limit))
        }
    }
}

/// Render an error with all of its sources.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
