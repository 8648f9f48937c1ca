//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding the listening port.
pub const PORT_ENV: &str = "GATEWAY_PORT";

/// Prefix of environment variables overriding upstream addresses.
pub const UPSTREAM_ENV_PREFIX: &str = "GATEWAY_UPSTREAM_";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidPort(String),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::InvalidPort(value) => write!(f, "{} is not a valid port: '{}'", PORT_ENV, value),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML file into an unvalidated configuration.
pub fn read_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Load the configuration, apply process environment overrides, validate.
///
/// Without a path the built-in route table is used.
pub fn load_config(path: Option<&Path>, port: Option<u16>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, std::env::vars())?;
    if let Some(port) = port {
        set_port(&mut config, port);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `GATEWAY_PORT` and `GATEWAY_UPSTREAM_<NAME>` overrides.
///
/// Upstream names are matched upper-cased with `-` replaced by `_`.
/// Variables naming an unknown upstream are ignored.
pub fn apply_env_overrides<I>(config: &mut GatewayConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        if key == PORT_ENV {
            let port = value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(value.clone()))?;
            set_port(config, port);
            continue;
        }

        let Some(suffix) = key.strip_prefix(UPSTREAM_ENV_PREFIX) else {
            continue;
        };

        match config
            .upstreams
            .iter_mut()
            .find(|u| env_key(&u.name) == suffix)
        {
            Some(upstream) => {
                tracing::debug!(upstream = %upstream.name, address = %value, "Upstream address from environment");
                upstream.address = value;
            }
            None => tracing::warn!(variable = %key, "Ignoring override for unknown upstream"),
        }
    }
    Ok(())
}

fn env_key(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}

fn set_port(config: &mut GatewayConfig, port: u16) {
    // An unparsable address is left for validation to report.
    if let Ok(mut addr) = config.listener.bind_address.parse::<SocketAddr>() {
        addr.set_port(port);
        config.listener.bind_address = addr.to_string();
    }
}
