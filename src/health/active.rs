//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend in the pool
//! - Publish each result into the backend's liveness flag
//! - Expose the latest tick's per-backend view

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, MissedTickBehavior};
use crate::config::HealthCheckConfig;
use crate::health::probe::{Probe, TcpProbe};
use crate::load_balancer::{BackendStatus, ServerPool};
use crate::observability::metrics;

/// Result of one scan over the pool.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    /// 1-based tick number; 0 means no tick has completed yet.
    pub tick: u64,
    pub backends: Vec<BackendStatus>,
}

pub struct HealthChecker<P = TcpProbe> {
    pool: Arc<ServerPool>,
    probe: P,
    interval: Duration,
    reports: watch::Sender<TickReport>,
}

impl HealthChecker<TcpProbe> {
    /// Checker using TCP connect probes with the configured interval and
    /// timeout.
    pub fn new(pool: Arc<ServerPool>, config: &HealthCheckConfig) -> Self {
        Self::with_probe(
            pool,
            TcpProbe::new(Duration::from_secs(config.timeout_secs)),
            Duration::from_secs(config.interval_secs),
        )
    }
}

impl<P: Probe> HealthChecker<P> {
    pub fn with_probe(pool: Arc<ServerPool>, probe: P, interval: Duration) -> Self {
        let (reports, _) = watch::channel(TickReport::default());
        Self {
            pool,
            probe,
            interval,
            reports,
        }
    }

    /// Receiver that always holds the most recent tick report.
    pub fn subscribe(&self) -> watch::Receiver<TickReport> {
        self.reports.subscribe()
    }

    /// Probe on every tick until `shutdown` fires (or its sender is dropped).
    ///
    /// The first tick runs immediately. A shutdown arriving mid-tick
    /// abandons the remaining probes of that tick.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = ?self.interval,
            backends = self.pool.len(),
            "Health checker starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {}
            }

            tick += 1;
            let backends = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                statuses = self.check_all() => statuses,
            };

            tracing::debug!(
                tick,
                alive = backends.iter().filter(|b| b.alive).count(),
                total = backends.len(),
                "Health check tick complete"
            );
            self.reports.send_replace(TickReport { tick, backends });
        }

        tracing::info!("Health checker received shutdown signal, exiting loop");
    }

    /// Probe every backend once, in registration order.
    pub async fn check_all(&self) -> Vec<BackendStatus> {
        let mut statuses = Vec::with_capacity(self.pool.len());

        for backend in self.pool.backends() {
            let alive = self.probe.probe(backend).await;
            let was_alive = backend.set_alive(alive);

            match (was_alive, alive) {
                (true, false) => tracing::warn!(backend = %backend.url(), "Backend is down"),
                (false, true) => tracing::info!(backend = %backend.url(), "Backend is back up"),
                _ => {}
            }
            metrics::record_backend_health(backend.url().as_str(), alive);

            let status = backend.status();
            tracing::debug!(
                backend = %status.address,
                alive = status.alive,
                requests = status.requests,
                "Health check"
            );
            statuses.push(status);
        }

        statuses
    }
}
