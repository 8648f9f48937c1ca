//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Matched request:
//!     → limits.rs (request body size against route policy)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → paths.rs (confine local file lookups to their root)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any check failure
//! - No trust in client input

pub mod headers;
pub mod limits;
pub mod paths;
