//! Mapping Gateway
//!
//! A reverse proxy for the redistricting stack, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                MAPPING GATEWAY               │
//!     Client Request      │  ┌─────────┐   ┌─────────┐   ┌───────────┐   │
//!     ────────────────────┼─▶│   net   │──▶│  http   │──▶│  routing  │   │
//!                         │  │listener │   │ server  │   │ (ordered) │   │
//!                         │  └─────────┘   └─────────┘   └─────┬─────┘   │
//!                         │                          ┌─────────┴───────┐ │
//!                         │                          ▼                 ▼ │
//!                         │                   ┌────────────┐   ┌────────┐│
//!                         │                   │  forward   │   │ files  ││──▶ local dirs
//!                         │                   │ + timeouts │   │        ││    (sld, static,
//!                         │                   └─────┬──────┘   └────────┘│     reports)
//!     Client Response     │  ┌──────────────┐       │                    │
//!     ◀───────────────────┼──│bounded relay │◀──────┴────────────────────┼──── web / geoserver
//!                         │  └──────────────┘                            │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use mapping_gateway::config::{load_config, loader::PORT_ENV};
use mapping_gateway::lifecycle::{signals, startup, Shutdown};
use mapping_gateway::observability::logging;
use mapping_gateway::routing::Router;

#[derive(Parser)]
#[command(name = "mapping-gateway")]
#[command(about = "Reverse proxy for the redistricting web stack", long_about = None)]
struct Cli {
    /// TOML configuration file; the built-in route table is used without one.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Listening port, overriding the configured bind address.
    #[arg(short, long, env = PORT_ENV)]
    port: Option<u16>,

    /// Validate the configuration, print the route table and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.port)?;

    if cli.check {
        let routes = Router::from_config(&config)?;
        for (index, route) in routes.routes().iter().enumerate() {
            println!("{:>2}. {:<24} {}", index + 1, route.name, route.matcher);
        }
        return Ok(());
    }

    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        upstreams = config.upstreams.len(),
        "mapping-gateway starting"
    );

    let shutdown = Shutdown::new();
    signals::spawn_handler(shutdown.clone());

    startup::start(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
