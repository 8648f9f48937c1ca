//! Client-facing error taxonomy.
//!
//! Every failure inside request handling ends up as one of these variants
//! and is rendered with a fixed body. Details (upstream names, addresses,
//! io errors) go to the log only.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// Errors produced while routing or relaying a request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("no route or file for path")]
    NotFound,

    #[error("upstream unreachable: {0}")]
    BadGateway(String),

    #[error("upstream did not respond within {0:?}")]
    GatewayTimeout(std::time::Duration),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            RelayError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            RelayError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::NotFound => "not_found",
            RelayError::BadGateway(_) => "bad_gateway",
            RelayError::GatewayTimeout(_) => "gateway_timeout",
            RelayError::PayloadTooLarge { .. } => "payload_too_large",
            RelayError::Internal(_) => "internal",
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            RelayError::NotFound => "Not Found",
            RelayError::BadGateway(_) => "Bad Gateway",
            RelayError::GatewayTimeout(_) => "Gateway Timeout",
            RelayError::PayloadTooLarge { .. } => "Payload Too Large",
            RelayError::Internal(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.public_message(),
        )
            .into_response()
    }
}
