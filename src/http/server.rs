//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Select a backend per request and hand off to the forwarder
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{client::legacy::{connect::HttpConnector, Client}, rt::TokioExecutor};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::http::proxy::{self, UpstreamClient};
use crate::http::request_id::{MakeRequestUuid, X_REQUEST_ID};
use crate::load_balancer::ServerPool;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ServerPool>,
    pub client: UpstreamClient,
}

/// Front-end HTTP server of the load balancer.
pub struct HttpServer {
    router: Router,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Create a server that balances across `pool`.
    pub fn new(pool: Arc<ServerPool>, config: &BalancerConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            pool: pool.clone(),
            client,
        };

        let router = Self::build_router(Duration::from_secs(config.timeouts.request_secs), state);
        Self { router, pool }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// The router, for serving it elsewhere or calling it in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// Accept connections on `listener` until `shutdown` fires. In-flight
    /// requests are allowed to finish.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: pick a backend and forward, or answer 503.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let backend = match state.pool.select_next() {
        Some(b) => b,
        None => {
            tracing::warn!(method = %method, path = %path, backends = state.pool.len(), "No backend available");
            metrics::record_no_backend();
            return (StatusCode::SERVICE_UNAVAILABLE, "Service not available").into_response();
        }
    };
    state.pool.record_request(&backend);

    tracing::debug!(
        method = %method,
        path = %path,
        backend = %backend.url(),
        "Proxying request"
    );

    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match proxy::forward(&state.client, &backend, request, client_addr).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), backend.authority(), start);
            response
        }
        Err(e) => {
            // Liveness is left to the next health check tick.
            tracing::error!(backend = %backend.url(), error = %e, "Upstream request failed");
            metrics::record_request(&method, 502, backend.authority(), start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
