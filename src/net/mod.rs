//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (optional TLS termination)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Accept waits for a free slot once `max_connections` are open
//! - A connection slot lives exactly as long as its stream
//! - TLS terminates here when a certificate is configured

pub mod listener;
pub mod tls;

pub use listener::{BoundedListener, PeerAddr};
