//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered scan)
//!     → matcher.rs (exact / prefix / digit pattern)
//!     → Return: matched Route (target + resolved policy) or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile matchers (patterns to tokens)
//!     → Merge policy overrides over defaults (policy.rs)
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - First match wins, in declaration order; no priority sorting

pub mod matcher;
pub mod policy;
pub mod router;

pub use matcher::{PathMatcher, PathPattern, PatternError};
pub use policy::{BufferPolicy, RoutePolicy};
pub use router::{PrefixRewrite, Route, RouteTarget, Router};
