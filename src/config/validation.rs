//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing upstreams)
//! - Validate value ranges (buffers > 0, timeouts > 0, addresses parse)
//! - Reject patterns and prefixes the matcher cannot compile
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::{GatewayConfig, MatcherConfig, PolicyDefaults, PolicyOverrides, TargetConfig};
use crate::routing::matcher::PathPattern;
use crate::upstream::parse_authority;

/// Largest accepted `buffer_count`; the relay queue is sized by it.
pub const MAX_BUFFER_COUNT: usize = 1 << 16;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    NoRoutes,
    InvalidBindAddress(String),
    ZeroMaxConnections,
    DuplicateUpstream(String),
    InvalidUpstreamAddress { upstream: String, address: String },
    DuplicateRoute(String),
    UnknownUpstream { route: String, upstream: String },
    NotAbsolutePath { route: String, value: String },
    InvalidPattern { route: String, reason: String },
    UnreachableRewrite { route: String, from: String },
    ZeroPolicyValue { scope: String, field: &'static str },
    PolicyValueTooLarge { scope: String, field: &'static str, max: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NoRoutes => write!(f, "no routes configured"),
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "listener bind address '{}' is not a socket address", addr)
            }
            ValidationError::ZeroMaxConnections => write!(f, "listener max_connections must be > 0"),
            ValidationError::DuplicateUpstream(name) => write!(f, "upstream '{}' defined twice", name),
            ValidationError::InvalidUpstreamAddress { upstream, address } => {
                write!(f, "upstream '{}' has invalid address '{}'", upstream, address)
            }
            ValidationError::DuplicateRoute(name) => write!(f, "route '{}' defined twice", name),
            ValidationError::UnknownUpstream { route, upstream } => {
                write!(f, "route '{}' references unknown upstream '{}'", route, upstream)
            }
            ValidationError::NotAbsolutePath { route, value } => {
                write!(f, "route '{}': '{}' must start with '/'", route, value)
            }
            ValidationError::InvalidPattern { route, reason } => {
                write!(f, "route '{}': invalid pattern: {}", route, reason)
            }
            ValidationError::UnreachableRewrite { route, from } => {
                write!(f, "route '{}': rewrite prefix '{}' can never apply to matched paths", route, from)
            }
            ValidationError::ZeroPolicyValue { scope, field } => {
                write!(f, "{}: {} must be > 0", scope, field)
            }
            ValidationError::PolicyValueTooLarge { scope, field, max } => {
                write!(f, "{}: {} must be at most {}", scope, field, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    check_defaults(&config.defaults, &mut errors);

    let mut upstream_names = HashSet::new();
    for upstream in &config.upstreams {
        if !upstream_names.insert(upstream.name.as_str()) {
            errors.push(ValidationError::DuplicateUpstream(upstream.name.clone()));
        }
        if parse_authority(&upstream.address).is_err() {
            errors.push(ValidationError::InvalidUpstreamAddress {
                upstream: upstream.name.clone(),
                address: upstream.address.clone(),
            });
        }
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::NoRoutes);
    }

    let mut route_names = HashSet::new();
    for route in &config.routes {
        if !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        let mut compiled = None;
        match &route.matcher {
            MatcherConfig::Exact { path: value } | MatcherConfig::Prefix { prefix: value } => {
                if !value.starts_with('/') {
                    errors.push(ValidationError::NotAbsolutePath {
                        route: route.name.clone(),
                        value: value.clone(),
                    });
                }
            }
            MatcherConfig::Pattern { pattern } => {
                if !pattern.starts_with('/') {
                    errors.push(ValidationError::NotAbsolutePath {
                        route: route.name.clone(),
                        value: pattern.clone(),
                    });
                }
                match PathPattern::parse(pattern) {
                    Ok(parsed) => compiled = Some(parsed),
                    Err(reason) => errors.push(ValidationError::InvalidPattern {
                        route: route.name.clone(),
                        reason: reason.to_string(),
                    }),
                }
            }
        }

        match &route.target {
            TargetConfig::Upstream { upstream, rewrite } => {
                if !upstream_names.contains(upstream.as_str()) {
                    errors.push(ValidationError::UnknownUpstream {
                        route: route.name.clone(),
                        upstream: upstream.clone(),
                    });
                }
                if let Some(rewrite) = rewrite {
                    if !rewrite.to.starts_with('/') {
                        errors.push(ValidationError::NotAbsolutePath {
                            route: route.name.clone(),
                            value: rewrite.to.clone(),
                        });
                    }
                    if !rewrite_can_apply(&route.matcher, compiled.as_ref(), &rewrite.from) {
                        errors.push(ValidationError::UnreachableRewrite {
                            route: route.name.clone(),
                            from: rewrite.from.clone(),
                        });
                    }
                }
            }
            TargetConfig::Local { strip_prefix, .. } => {
                if let Some(prefix) = strip_prefix {
                    if !prefix.starts_with('/') {
                        errors.push(ValidationError::NotAbsolutePath {
                            route: route.name.clone(),
                            value: prefix.clone(),
                        });
                    }
                }
            }
        }

        check_overrides(&route.name, &route.policy, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_defaults(defaults: &PolicyDefaults, errors: &mut Vec<ValidationError>) {
    let scope = "defaults".to_string();
    if defaults.buffer_count == 0 {
        errors.push(ValidationError::ZeroPolicyValue { scope: scope.clone(), field: "buffer_count" });
    }
    if defaults.buffer_count > MAX_BUFFER_COUNT {
        errors.push(ValidationError::PolicyValueTooLarge {
            scope: scope.clone(),
            field: "buffer_count",
            max: MAX_BUFFER_COUNT,
        });
    }
    if defaults.buffer_size == 0 {
        errors.push(ValidationError::ZeroPolicyValue { scope: scope.clone(), field: "buffer_size" });
    }
    if defaults.read_timeout_secs == 0 {
        errors.push(ValidationError::ZeroPolicyValue { scope, field: "read_timeout_secs" });
    }
}

fn check_overrides(route: &str, policy: &PolicyOverrides, errors: &mut Vec<ValidationError>) {
    let scope = format!("route '{}'", route);
    match policy.buffer_count {
        Some(0) => errors.push(ValidationError::ZeroPolicyValue { scope: scope.clone(), field: "buffer_count" }),
        Some(count) if count > MAX_BUFFER_COUNT => errors.push(ValidationError::PolicyValueTooLarge {
            scope: scope.clone(),
            field: "buffer_count",
            max: MAX_BUFFER_COUNT,
        }),
        _ => {}
    }
    if policy.buffer_size == Some(0) {
        errors.push(ValidationError::ZeroPolicyValue { scope: scope.clone(), field: "buffer_size" });
    }
    if policy.read_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroPolicyValue { scope, field: "read_timeout_secs" });
    }
}

/// A rewrite prefix is reachable when some path accepted by the matcher
/// can start with it. An uncompilable pattern is reported on its own.
fn rewrite_can_apply(matcher: &MatcherConfig, compiled: Option<&PathPattern>, from: &str) -> bool {
    let head = match (matcher, compiled) {
        (MatcherConfig::Exact { path }, _) => return path.starts_with(from),
        (MatcherConfig::Prefix { prefix }, _) => prefix.as_str(),
        (MatcherConfig::Pattern { .. }, Some(pattern)) => pattern.literal_prefix(),
        (MatcherConfig::Pattern { .. }, None) => return true,
    };
    head.starts_with(from) || from.starts_with(head)
}
