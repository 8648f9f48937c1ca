//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (read timeout on the exchange, error classification)
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline
//! - No retries and no circuit breaking: a failed upstream call surfaces as
//!   a gateway error

pub mod timeouts;
