//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Look up the first route whose matcher accepts a path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan; list position is the only specificity rule
//! - Explicit NoMatch rather than silent default

use std::path::PathBuf;

use crate::config::{GatewayConfig, RewriteConfig, TargetConfig};
use crate::routing::matcher::{PathMatcher, PatternError};
use crate::routing::policy::RoutePolicy;

/// Replace a leading path prefix before forwarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRewrite {
    pub from: String,
    pub to: String,
}

impl PrefixRewrite {
    /// Rewritten path, or the input unchanged when it lacks the prefix.
    pub fn apply(&self, path: &str) -> String {
        match path.strip_prefix(self.from.as_str()) {
            Some(rest) => {
                let mut out = String::with_capacity(self.to.len() + rest.len());
                out.push_str(&self.to);
                if out.ends_with('/') && rest.starts_with('/') {
                    out.push_str(&rest[1..]);
                } else {
                    out.push_str(rest);
                }
                out
            }
            None => path.to_string(),
        }
    }
}

impl From<&RewriteConfig> for PrefixRewrite {
    fn from(config: &RewriteConfig) -> Self {
        Self {
            from: config.from.clone(),
            to: config.to.clone(),
        }
    }
}

/// Where a matched request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Upstream {
        upstream: String,
        rewrite: Option<PrefixRewrite>,
    },
    Local {
        root: PathBuf,
        strip_prefix: Option<String>,
    },
}

impl RouteTarget {
    fn from_config(config: &TargetConfig) -> Self {
        match config {
            TargetConfig::Upstream { upstream, rewrite } => RouteTarget::Upstream {
                upstream: upstream.clone(),
                rewrite: rewrite.as_ref().map(PrefixRewrite::from),
            },
            TargetConfig::Local { root, strip_prefix } => RouteTarget::Local {
                root: root.clone(),
                strip_prefix: strip_prefix.clone(),
            },
        }
    }
}

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub matcher: PathMatcher,
    pub target: RouteTarget,
    pub policy: RoutePolicy,
}

/// Ordered, immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Compile the routes of a validated configuration, keeping their order.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, PatternError> {
        let routes = config
            .routes
            .iter()
            .map(|route| {
                Ok(Route {
                    name: route.name.clone(),
                    matcher: PathMatcher::from_config(&route.matcher)?,
                    target: RouteTarget::from_config(&route.target),
                    policy: RoutePolicy::resolve(&config.defaults, &route.policy),
                })
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        Ok(Self { routes })
    }

    /// First route whose matcher accepts `path`. Later routes are never
    /// consulted once one matches.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(path))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
