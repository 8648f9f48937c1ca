//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration not tied to a single route.
    pub timeouts: TimeoutConfig,

    /// Base policy applied where a route does not override a field.
    pub defaults: PolicyDefaults,

    /// Named upstream services.
    pub upstreams: Vec<UpstreamConfig>,

    /// Ordered route definitions. The first matching entry wins.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    /// The redistricting stack layout: web application, map server, and
    /// three locally served directories.
    fn default() -> Self {
        let enlarged = PolicyOverrides {
            buffer_count: Some(64),
            buffer_size: Some(64 * 1024),
            ..PolicyOverrides::default()
        };

        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            defaults: PolicyDefaults::default(),
            upstreams: vec![
                UpstreamConfig {
                    name: "web".to_string(),
                    address: "127.0.0.1:8000".to_string(),
                },
                UpstreamConfig {
                    name: "geoserver".to_string(),
                    address: "127.0.0.1:8600".to_string(),
                },
            ],
            routes: vec![
                RouteConfig {
                    name: "unlocked-geometries".to_string(),
                    matcher: MatcherConfig::Pattern {
                        pattern: "/districtmapping/plan/{plan_id}/unlockedgeometries/".to_string(),
                    },
                    target: TargetConfig::upstream("web"),
                    policy: PolicyOverrides {
                        max_body_bytes: Some(20 * 1024 * 1024),
                        ..enlarged.clone()
                    },
                },
                RouteConfig {
                    name: "versioned-districts".to_string(),
                    matcher: MatcherConfig::Pattern {
                        pattern: "/districtmapping/plan/{plan_id}/district/versioned/".to_string(),
                    },
                    target: TargetConfig::upstream("web"),
                    policy: enlarged,
                },
                RouteConfig {
                    name: "geoserver".to_string(),
                    matcher: MatcherConfig::Prefix {
                        prefix: "/geoserver/".to_string(),
                    },
                    target: TargetConfig::upstream("geoserver"),
                    policy: PolicyOverrides::default(),
                },
                RouteConfig::local("sld", "/sld/", "/var/lib/mapping/sld"),
                RouteConfig::local("static", "/static/", "/var/lib/mapping/static"),
                RouteConfig::local("reports", "/reports/", "/var/lib/mapping/reports"),
                RouteConfig {
                    name: "web".to_string(),
                    matcher: MatcherConfig::Prefix {
                        prefix: "/".to_string(),
                    },
                    target: TargetConfig::upstream("web"),
                    policy: PolicyOverrides::default(),
                },
            ],
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

/// Timeout configuration for process-wide operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// How long in-flight requests may drain after a shutdown signal.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            shutdown_grace_secs: 30,
        }
    }
}

/// Base request/response policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PolicyDefaults {
    /// Maximum request body size in bytes. 0 disables the limit.
    pub max_body_bytes: u64,

    /// Number of response chunks staged between upstream and client.
    pub buffer_count: usize,

    /// Maximum size of one staged response chunk in bytes.
    pub buffer_size: usize,

    /// Longest wait for the next piece of an upstream response, in seconds.
    pub read_timeout_secs: u64,

    /// Forward the client's Host header instead of the upstream address.
    pub preserve_host: bool,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            buffer_count: 8,
            buffer_size: 8 * 1024,
            read_timeout_secs: 600,
            preserve_host: true,
        }
    }
}

/// Per-route overrides of [`PolicyDefaults`].
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyOverrides {
    pub max_body_bytes: Option<u64>,
    pub buffer_count: Option<usize>,
    pub buffer_size: Option<usize>,
    pub read_timeout_secs: Option<u64>,
    pub preserve_host: Option<bool>,
}

/// A named upstream service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Name referenced by routes.
    pub name: String,

    /// `host:port`; the host may be a DNS name.
    pub address: String,
}

/// Route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path condition.
    pub matcher: MatcherConfig,

    /// Where matching requests go.
    pub target: TargetConfig,

    #[serde(default)]
    pub policy: PolicyOverrides,
}

impl RouteConfig {
    /// A prefix route served from a local directory with the prefix stripped.
    pub fn local(name: &str, prefix: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            matcher: MatcherConfig::Prefix {
                prefix: prefix.to_string(),
            },
            target: TargetConfig::Local {
                root: root.into(),
                strip_prefix: Some(prefix.to_string()),
            },
            policy: PolicyOverrides::default(),
        }
    }
}

/// Path condition of a route.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatcherConfig {
    /// Whole path equality.
    Exact { path: String },
    /// Path starts with the prefix.
    Prefix { prefix: String },
    /// Literal text with `{name}` placeholders matching one or more digits.
    Pattern { pattern: String },
}

/// Route target.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetConfig {
    /// Forward to a named upstream.
    Upstream {
        upstream: String,
        #[serde(default)]
        rewrite: Option<RewriteConfig>,
    },
    /// Serve files from a local directory.
    Local {
        root: PathBuf,
        #[serde(default)]
        strip_prefix: Option<String>,
    },
}

impl TargetConfig {
    pub fn upstream(name: &str) -> Self {
        TargetConfig::Upstream {
            upstream: name.to_string(),
            rewrite: None,
        }
    }
}

/// Replace a leading path prefix before forwarding.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RewriteConfig {
    pub from: String,
    pub to: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_builtin_table() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.routes.len(), 7);
        assert_eq!(config.upstreams.len(), 2);
        assert_eq!(config.routes.last().unwrap().name, "web");
    }

    #[test]
    fn parses_tagged_matchers_and_targets() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[upstreams]]
            name = "tiles"
            address = "tiles.internal:8080"

            [[routes]]
            name = "tiles"
            matcher = { kind = "pattern", pattern = "/tiles/{z}/" }
            target = { kind = "upstream", upstream = "tiles", rewrite = { from = "/tiles/", to = "/" } }

            [routes.policy]
            read_timeout_secs = 30

            [[routes]]
            name = "assets"
            matcher = { kind = "prefix", prefix = "/assets/" }
            target = { kind = "local", root = "/srv/assets", strip_prefix = "/assets/" }
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[0].policy.read_timeout_secs, Some(30));
        assert_eq!(
            config.routes[0].target,
            TargetConfig::Upstream {
                upstream: "tiles".into(),
                rewrite: Some(RewriteConfig {
                    from: "/tiles/".into(),
                    to: "/".into()
                }),
            }
        );
        assert!(matches!(config.routes[1].target, TargetConfig::Local { .. }));
    }
}
