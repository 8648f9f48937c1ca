//! Header manipulation for forwarded requests and relayed responses.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Set Host from the client request (or the upstream when not preserved)
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Real-IP
//!
//! # Design Decisions
//! - Existing X-Forwarded-For is extended, never replaced
//! - Headers listed in `Connection` are treated as hop-by-hop too

use std::net::IpAddr;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::uri::Authority;

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub static X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

static KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
static PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

/// Remove connection-scoped headers before a message crosses the gateway.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in [
        &header::CONNECTION,
        &KEEP_ALIVE,
        &PROXY_CONNECTION,
        &header::PROXY_AUTHENTICATE,
        &header::PROXY_AUTHORIZATION,
        &header::TE,
        &header::TRAILER,
        &header::TRANSFER_ENCODING,
        &header::UPGRADE,
    ] {
        headers.remove(name);
    }
}

/// Facts about the inbound request needed to build upstream headers.
#[derive(Debug, Clone)]
pub struct ForwardContext<'a> {
    pub client_ip: IpAddr,
    /// Host header of the client request, or its URI authority for HTTP/2.
    pub original_host: Option<HeaderValue>,
    pub scheme: &'static str,
    pub preserve_host: bool,
    pub upstream: &'a Authority,
}

/// Rewrite inbound headers into the set forwarded upstream.
pub fn prepare_upstream_headers(headers: &mut HeaderMap, ctx: &ForwardContext<'_>) {
    strip_hop_by_hop(headers);

    let host = match (&ctx.original_host, ctx.preserve_host) {
        (Some(host), true) => Some(host.clone()),
        _ => HeaderValue::from_str(ctx.upstream.as_str()).ok(),
    };
    if let Some(host) = host {
        headers.insert(header::HOST, host);
    }

    let client = ctx.client_ip.to_string();
    let forwarded_for = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.trim().is_empty() => format!("{}, {}", existing, client),
        _ => client.clone(),
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert(X_FORWARDED_FOR.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&client) {
        headers.insert(X_REAL_IP.clone(), value);
    }
    headers.insert(X_FORWARDED_PROTO.clone(), HeaderValue::from_static(ctx.scheme));
}
