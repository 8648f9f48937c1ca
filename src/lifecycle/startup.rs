//! Startup orchestration.
//!
//! # Responsibilities
//! - Compile the route table from the validated configuration
//! - Start the metrics endpoint when enabled
//! - Bind the listener (plain or TLS) and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last, so traffic arrives only once routing is ready

use std::net::SocketAddr;

use anyhow::Context;

use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::tls::load_tls_config;
use crate::observability::metrics;

/// Bring the gateway up and run it until `shutdown` fires.
pub async fn start(config: GatewayConfig, shutdown: &Shutdown) -> anyhow::Result<()> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let bind_address: SocketAddr = config
        .listener
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.listener.bind_address))?;
    let tls = config.listener.tls.clone();

    let server = HttpServer::new(config).context("building route table")?;

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await.context("loading TLS material")?;
            server.run_tls(bind_address, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(bind_address)
                .await
                .with_context(|| format!("binding {}", bind_address))?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }
    Ok(())
}
