//! Upstream registry.
//!
//! # Responsibilities
//! - Resolve upstream names to a `host:port` authority
//! - Build the upstream URI for a forwarded request
//!
//! # Design Decisions
//! - One address per upstream; no balancing across replicas
//! - DNS names are resolved by the client connector on every new connection,
//!   so container restarts that change addresses are picked up
//! - Immutable after construction (shared via Arc, no locking)

use std::collections::HashMap;
use std::str::FromStr;

use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::Uri;

use crate::config::UpstreamConfig;

/// Error for an upstream address that cannot be used as an authority.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("not a valid authority: {0}")]
    Invalid(#[from] axum::http::uri::InvalidUri),
    #[error("address must include a port")]
    MissingPort,
    #[error("address must not contain credentials")]
    Credentials,
}

/// Parse a `host:port` string into an authority.
pub fn parse_authority(address: &str) -> Result<Authority, AddressError> {
    let authority = Authority::from_str(address)?;
    if authority.as_str().contains('@') {
        return Err(AddressError::Credentials);
    }
    if authority.port_u16().is_none() {
        return Err(AddressError::MissingPort);
    }
    Ok(authority)
}

/// A named backend service.
#[derive(Debug, Clone)]
pub struct Upstream {
    name: String,
    authority: Authority,
}

impl Upstream {
    pub fn new(name: impl Into<String>, authority: Authority) -> Self {
        Self {
            name: name.into(),
            authority,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Absolute URI on this upstream for the given path and query.
    pub fn uri_for(&self, path_and_query: PathAndQuery) -> Result<Uri, axum::http::Error> {
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
    }
}

/// All configured upstreams, keyed by name.
#[derive(Debug, Default)]
pub struct UpstreamSet {
    upstreams: HashMap<String, Upstream>,
}

impl UpstreamSet {
    /// Build the set from validated configuration.
    pub fn from_config(configs: &[UpstreamConfig]) -> Result<Self, AddressError> {
        let mut upstreams = HashMap::with_capacity(configs.len());
        for config in configs {
            let authority = parse_authority(&config.address)?;
            tracing::debug!(upstream = %config.name, address = %authority, "Upstream registered");
            upstreams.insert(config.name.clone(), Upstream::new(config.name.clone(), authority));
        }
        Ok(Self { upstreams })
    }

    pub fn get(&self, name: &str) -> Option<&Upstream> {
        self.upstreams.get(name)
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstreams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_requires_port() {
        assert!(parse_authority("geoserver:8080").is_ok());
        assert!(matches!(parse_authority("geoserver"), Err(AddressError::MissingPort)));
        assert!(matches!(parse_authority("user:pw@web:80"), Err(AddressError::Credentials)));
        assert!(parse_authority("not an address").is_err());
    }

    #[test]
    fn builds_upstream_uri() {
        let upstream = Upstream::new("web", parse_authority("django:8000").unwrap());
        let uri = upstream
            .uri_for(PathAndQuery::from_static("/districtmapping/plan/7/?x=1"))
            .unwrap();
        assert_eq!(uri.to_string(), "http://django:8000/districtmapping/plan/7/?x=1");
    }

    #[test]
    fn set_resolves_names() {
        let set = UpstreamSet::from_config(&[UpstreamConfig {
            name: "web".into(),
            address: "127.0.0.1:8000".into(),
        }])
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("web").unwrap().authority().as_str(), "127.0.0.1:8000");
        assert!(set.get("geoserver").is_none());
    }
}
