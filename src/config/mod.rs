//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into the route table at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a process restart
//! - All fields have defaults; an empty file yields the built-in route table
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    GatewayConfig, ListenerConfig, MatcherConfig, ObservabilityConfig, PolicyDefaults, PolicyOverrides,
    RewriteConfig, RouteConfig, TargetConfig, TimeoutConfig, TlsConfig, UpstreamConfig,
};
