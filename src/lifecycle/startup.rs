//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the server pool from validated configuration
//! - Start background tasks (health checker, metrics, admin API)
//! - Bind the proxy listener and serve until shutdown
//! - Bound the drain period after shutdown is triggered

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio::time;

use crate::admin::{serve_admin, AdminState};
use crate::config::BalancerConfig;
use crate::health::{HealthChecker, TickReport};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{AddressError, ServerPool};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Pool(#[from] AddressError),

    #[error("invalid {field} '{value}'")]
    Address { field: &'static str, value: String },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] JoinError),
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address).await.map_err(|source| StartupError::Bind {
        address: address.to_string(),
        source,
    })
}

/// Run the load balancer until `shutdown` is triggered and the proxy
/// listener has drained (or the drain deadline passes).
pub async fn run(config: BalancerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    // Subscribe up front so a signal arriving during startup is not missed.
    let mut stop = shutdown.subscribe();
    let checker_shutdown = shutdown.subscribe();
    let admin_shutdown = shutdown.subscribe();
    let server_shutdown = shutdown.subscribe();

    let pool = Arc::new(ServerPool::from_addresses(&config.backends)?);
    for backend in pool.backends() {
        tracing::info!(backend = %backend.url(), "Backend registered");
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse().map_err(|_| {
            StartupError::Address {
                field: "observability.metrics_address",
                value: config.observability.metrics_address.clone(),
            }
        })?;
        metrics::init_metrics(addr);
    }

    let (reports, checker_task) = if config.health_check.enabled {
        let checker = HealthChecker::new(pool.clone(), &config.health_check);
        let reports = checker.subscribe();
        (reports, Some(tokio::spawn(checker.run(checker_shutdown))))
    } else {
        tracing::info!("Active health checks disabled");
        let (_, reports) = watch::channel(TickReport::default());
        (reports, None)
    };

    if config.admin.enabled {
        let listener = bind(&config.admin.bind_address).await?;
        let state = AdminState {
            pool: pool.clone(),
            reports,
            api_key: Arc::from(config.admin.api_key.as_str()),
        };
        tokio::spawn(async move {
            if let Err(e) = serve_admin(listener, state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        });
    }

    let listener = bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(pool, &config);
    let mut server_task = tokio::spawn(server.run(listener, server_shutdown));

    let result = tokio::select! {
        joined = &mut server_task => {
            // The server only returns on its own when it failed.
            shutdown.trigger();
            joined.map_err(StartupError::from).and_then(|r| r.map_err(StartupError::from))
        }
        _ = stop.recv() => {
            let drain = Duration::from_secs(config.timeouts.shutdown_secs);
            match time::timeout(drain, &mut server_task).await {
                Ok(joined) => joined.map_err(StartupError::from).and_then(|r| r.map_err(StartupError::from)),
                Err(_) => {
                    tracing::warn!(deadline = ?drain, "Drain deadline reached, dropping remaining connections");
                    server_task.abort();
                    Ok(())
                }
            }
        }
    };

    if let Some(task) = checker_task {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Health checker task failed");
        }
    }

    result
}
