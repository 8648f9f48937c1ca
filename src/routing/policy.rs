//! Effective per-route policy.
//!
//! Route overrides are merged over the configured defaults once, at table
//! compilation, so request handling never consults the raw config.

use std::time::Duration;

use crate::config::{PolicyDefaults, PolicyOverrides};

/// Bounds for staging an upstream response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Number of chunks that may be queued for the client.
    pub count: usize,
    /// Maximum bytes in one chunk.
    pub size: usize,
}

impl BufferPolicy {
    /// Upper bound of staged bytes.
    pub fn capacity(&self) -> usize {
        self.count.saturating_mul(self.size)
    }
}

/// Resolved policy of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicy {
    /// `None` when unlimited.
    pub max_body_bytes: Option<u64>,
    pub buffers: BufferPolicy,
    pub read_timeout: Duration,
    pub preserve_host: bool,
}

impl RoutePolicy {
    pub fn resolve(defaults: &PolicyDefaults, overrides: &PolicyOverrides) -> Self {
        let max_body_bytes = overrides.max_body_bytes.unwrap_or(defaults.max_body_bytes);
        Self {
            max_body_bytes: (max_body_bytes > 0).then_some(max_body_bytes),
            buffers: BufferPolicy {
                count: overrides.buffer_count.unwrap_or(defaults.buffer_count),
                size: overrides.buffer_size.unwrap_or(defaults.buffer_size),
            },
            read_timeout: Duration::from_secs(overrides.read_timeout_secs.unwrap_or(defaults.read_timeout_secs)),
            preserve_host: overrides.preserve_host.unwrap_or(defaults.preserve_host),
        }
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::resolve(&PolicyDefaults::default(), &PolicyOverrides::default())
    }
}
