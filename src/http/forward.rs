//! Forwarding a request to its upstream.
//!
//! # Data Flow
//! ```text
//! matched Route (Upstream target)
//!     → limits.rs (body size verdict)
//!     → rewrite path prefix, build upstream URI
//!     → headers.rs (Host, X-Forwarded-*)
//!     → timeouts.rs (read timeout on response headers)
//!     → response.rs (bounded relay of the body)
//! ```

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{header, HeaderValue, Request, Version};
use axum::response::Response;

use crate::error::RelayError;
use crate::http::response;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::timeouts::await_upstream;
use crate::routing::{PrefixRewrite, Route};
use crate::security::headers::{prepare_upstream_headers, ForwardContext};
use crate::security::limits::limit_body;

/// Relay `request` to `upstream` under `route`'s policy.
pub async fn forward(
    state: &AppState,
    route: &Route,
    upstream: &str,
    rewrite: Option<&PrefixRewrite>,
    peer: SocketAddr,
    request: Request<Body>,
) -> Result<Response, RelayError> {
    let upstream = state
        .upstreams
        .get(upstream)
        .ok_or_else(|| RelayError::Internal(format!("route '{}' names unknown upstream '{}'", route.name, upstream)))?;

    let (mut parts, body) = request.into_parts();

    let body = limit_body(body, &parts.headers, route.policy.max_body_bytes)
        .await
        .inspect_err(|e| {
            if matches!(e, RelayError::PayloadTooLarge { .. }) {
                metrics::record_rejected_body(&route.name);
            }
        })?;

    let path = match rewrite {
        Some(rewrite) => rewrite.apply(parts.uri.path()),
        None => parts.uri.path().to_string(),
    };
    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path,
    };
    let path_and_query = PathAndQuery::try_from(path_and_query)
        .map_err(|e| RelayError::Internal(format!("rewritten path is invalid: {}", e)))?;
    let uri = upstream
        .uri_for(path_and_query)
        .map_err(|e| RelayError::Internal(format!("building upstream uri: {}", e)))?;

    let original_host = parts.headers.get(header::HOST).cloned().or_else(|| {
        parts
            .uri
            .authority()
            .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
    });
    prepare_upstream_headers(
        &mut parts.headers,
        &ForwardContext {
            client_ip: peer.ip(),
            original_host,
            scheme: state.scheme,
            preserve_host: route.policy.preserve_host,
            upstream: upstream.authority(),
        },
    );

    tracing::debug!(route = %route.name, upstream = %upstream.name(), uri = %uri, "Forwarding request");

    parts.uri = uri;
    // The upstream pool speaks HTTP/1.1 regardless of the client protocol.
    parts.version = Version::HTTP_11;
    let outbound = Request::from_parts(parts, body);

    let upstream_response = await_upstream(
        state.client.request(outbound),
        route.policy.read_timeout,
        upstream.name(),
    )
    .await?;

    Ok(response::relay(
        upstream_response,
        route.policy.buffers,
        route.policy.read_timeout,
    ))
}
