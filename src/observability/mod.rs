//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (request counters, latency histograms, upstream errors)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every log event of a request carries its request ID
//! - Metrics are off unless an exporter address is configured; the macros
//!   are no-ops without a recorder

pub mod logging;
pub mod metrics;
