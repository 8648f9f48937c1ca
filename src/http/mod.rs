//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, route lookup)
//!     → files.rs (Local target: serve from disk)
//!     → forward.rs (Upstream target: relay to backend)
//!     → response.rs (strip headers, bounded body relay)
//!     → Send to client
//! ```

pub mod files;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
