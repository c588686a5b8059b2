//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lb_requests_total` (counter): proxied requests by backend, status
//! - `lb_request_duration_seconds` (histogram): end-to-end latency
//! - `lb_no_backend_total` (counter): requests rejected with 503
//! - `lb_backend_up` (gauge): 1=alive, 0=dead, set on every health tick

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, backend: &str, start: Instant) {
    counter!(
        "lb_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "backend" => backend.to_string()
    )
    .increment(1);
    histogram!(
        "lb_request_duration_seconds",
        "method" => method.to_string(),
        "backend" => backend.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_no_backend() {
    counter!("lb_no_backend_total").increment(1);
}

pub fn record_backend_health(backend: &str, alive: bool) {
    gauge!("lb_backend_up", "backend" => backend.to_string()).set(if alive { 1.0 } else { 0.0 });
}
