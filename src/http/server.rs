//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum app with the single gateway handler
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bounded listener, plain or TLS
//! - Dispatch matched routes to local files or upstream forwarding

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::validation::{validate_config, ValidationError};
use crate::config::GatewayConfig;
use crate::error::RelayError;
use crate::http::files::serve_local;
use crate::http::forward::forward;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::shutdown::recv_shutdown;
use crate::net::{BoundedListener, PeerAddr};
use crate::observability::metrics;
use crate::routing::{PatternError, RouteTarget, Router as RouteTable};
use crate::upstream::{AddressError, UpstreamSet};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub upstreams: Arc<UpstreamSet>,
    pub client: Client<HttpConnector, Body>,
    /// Scheme reported to upstreams in X-Forwarded-Proto.
    pub scheme: &'static str,
}

/// Error building the server from a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
    #[error("route pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("upstream address: {0}")]
    Address(#[from] AddressError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// HTTP server for the gateway.
pub struct HttpServer {
    app: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Validate `config` and compile its route table and upstream registry.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ServerError::Invalid)?;
        let routes = RouteTable::from_config(&config)?;
        let upstreams = UpstreamSet::from_config(&config.upstreams)?;

        for route in routes.routes() {
            tracing::info!(
                route = %route.name,
                matcher = %route.matcher,
                max_body_bytes = ?route.policy.max_body_bytes,
                buffer_count = route.policy.buffers.count,
                buffer_size = route.policy.buffers.size,
                read_timeout_secs = route.policy.read_timeout.as_secs(),
                "Route loaded"
            );
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            routes: Arc::new(routes),
            upstreams: Arc::new(upstreams),
            client,
            scheme: if config.listener.tls.is_some() { "https" } else { "http" },
        };

        Ok(Self {
            app: Self::build_router(state),
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone())),
            )
    }

    /// Run the server on a plain TCP listener until shutdown is signalled.
    ///
    /// In-flight requests get `shutdown_grace_secs` to finish.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let listener = BoundedListener::from_tcp(listener, self.config.listener.max_connections);
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let deadline = shutdown.resubscribe();

        tracing::info!("HTTP server starting");
        let app = self.app.into_make_service_with_connect_info::<PeerAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(recv_shutdown(shutdown))
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = async {
                recv_shutdown(deadline).await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed with requests in flight");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination until shutdown is signalled.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let handle = axum_server::Handle::new();

        let signal = handle.clone();
        tokio::spawn(async move {
            recv_shutdown(shutdown).await;
            signal.graceful_shutdown(Some(grace));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.app.into_make_service_with_connect_info::<PeerAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Match the route and serve or forward the request.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(PeerAddr(peer)): ConnectInfo<PeerAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let Some(route) = state.routes.match_path(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request("none", 404, start);
        return RelayError::NotFound.into_response();
    };

    let result = match &route.target {
        RouteTarget::Local { root, strip_prefix } => serve_local(request, root, strip_prefix.as_deref()).await,
        RouteTarget::Upstream { upstream, rewrite } => {
            forward(&state, route, upstream, rewrite.as_ref(), peer, request).await
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            match &e {
                RelayError::NotFound | RelayError::PayloadTooLarge { .. } => {
                    tracing::info!(request_id = %request_id, route = %route.name, path = %path, error = %e, "Request rejected");
                }
                _ => {
                    tracing::error!(request_id = %request_id, route = %route.name, path = %path, error = %e, "Request failed");
                }
            }
            e.into_response()
        }
    };

    metrics::record_request(&route.name, response.status().as_u16(), start);
    response
}
