//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the ordered backend registry (fixed after startup)
//! - Answer "which backend takes the next request"
//! - Expose per-backend state for health checks and diagnostics

use std::sync::Arc;
use url::Url;
use crate::load_balancer::{
    backend::{parse_backend_url, AddressError, Backend, BackendStatus},
    round_robin::RoundRobin,
};

/// Ordered registry of backends plus the round-robin cursor.
///
/// Registration order is rotation order. Entries are never removed, so
/// indices stay valid for the life of the pool and the health checker can
/// iterate without taking the selection lock.
#[derive(Debug, Default)]
pub struct ServerPool {
    backends: Vec<Arc<Backend>>,
    selector: RoundRobin,
}

impl ServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from configured addresses, preserving their order.
    ///
    /// Any malformed address fails the whole pool.
    pub fn from_addresses<I, S>(addresses: I) -> Result<Self, AddressError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pool = Self::new();
        for address in addresses {
            pool.add(address.as_ref())?;
        }
        Ok(pool)
    }

    /// Append an already-validated backend URL. The new backend starts
    /// alive with zero requests.
    ///
    /// Takes `&mut self`: registration happens before the pool is shared.
    pub fn register(&mut self, url: Url) {
        tracing::debug!(backend = %url, index = self.backends.len(), "Registering backend");
        self.backends.push(Arc::new(Backend::new(url)));
    }

    /// Parse and register a configured address.
    pub fn add(&mut self, address: &str) -> Result<(), AddressError> {
        self.register(parse_backend_url(address)?);
        Ok(())
    }

    /// Pick the next alive backend in rotation, or `None` when nothing is
    /// alive.
    pub fn select_next(&self) -> Option<Arc<Backend>> {
        self.selector
            .next_index(&self.backends)
            .map(|index| self.backends[index].clone())
    }

    /// Count a request against the chosen backend.
    pub fn record_request(&self, backend: &Backend) {
        backend.record_request();
    }

    /// All backends, in registration order.
    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Number of backends currently marked alive.
    pub fn alive_count(&self) -> usize {
        self.backends.iter().filter(|b| b.is_alive()).count()
    }

    /// Per-backend address, liveness and request count.
    pub fn snapshot(&self) -> Vec<BackendStatus> {
        self.backends.iter().map(|b| b.status()).collect()
    }
}
