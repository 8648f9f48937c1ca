//! Mapping Gateway Library
//!
//! Reverse proxy in front of a redistricting web stack: one listening port,
//! an ordered route table, per-route body and buffering policy, and local
//! serving of static assets, style layers and generated reports.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::RelayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
