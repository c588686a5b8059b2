//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Guard the liveness flag (written by the health checker, read per request)
//! - Count requests routed to the backend without locking

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use url::Url;

/// A backend address that could not be turned into a routable URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid backend address '{address}': {reason}")]
pub struct AddressError {
    pub address: String,
    pub reason: String,
}

impl AddressError {
    fn new(address: &str, reason: impl Into<String>) -> Self {
        Self {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a configured backend address such as `http://10.0.0.7:8081`.
///
/// Only plain `http` upstreams are accepted, and the URL must resolve to a
/// host and a port (explicit or the scheme default).
pub fn parse_backend_url(address: &str) -> Result<Url, AddressError> {
    let url = Url::parse(address.trim()).map_err(|e| AddressError::new(address, e.to_string()))?;

    if url.scheme() != "http" {
        return Err(AddressError::new(
            address,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(AddressError::new(address, "missing host"));
    }
    if url.port_or_known_default().is_none() {
        return Err(AddressError::new(address, "missing port"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(AddressError::new(address, "query and fragment are not allowed"));
    }

    Ok(url)
}

/// A single upstream server.
#[derive(Debug)]
pub struct Backend {
    url: Url,
    /// `host:port`, used for probing and as the upstream URI authority.
    authority: String,
    /// Outbound `Host` header: the port is present only when the address
    /// names a non-default one.
    host: String,
    alive: RwLock<bool>,
    requests: AtomicU64,
}

impl Backend {
    /// Create a backend that starts out alive with zero requests.
    pub fn new(url: Url) -> Self {
        // parse_backend_url guarantees host and port; fall back to the raw
        // string for hand-built URLs so the backend is still probe-able.
        let authority = match (url.host_str(), url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            _ => url.as_str().to_string(),
        };
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => authority.clone(),
        };

        Self {
            url,
            authority,
            host,
            alive: RwLock::new(true),
            requests: AtomicU64::new(0),
        }
    }

    /// Build a backend straight from a configured address.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        parse_backend_url(address).map(Self::new)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The `host:port` the backend listens on.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Value sent as `Host` to this backend.
    pub fn host_header(&self) -> &str {
        &self.host
    }

    pub fn is_alive(&self) -> bool {
        *self.alive.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a probe result. Returns the previous value so callers can
    /// log transitions.
    pub fn set_alive(&self, alive: bool) -> bool {
        let mut guard = self.alive.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, alive)
    }

    /// Count one request routed here.
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Cumulative number of requests routed to this backend.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> BackendStatus {
        BackendStatus {
            address: self.url.to_string(),
            alive: self.is_alive(),
            requests: self.requests(),
        }
    }
}

/// Point-in-time view of a backend, for logs and the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendStatus {
    pub address: String,
    pub alive: bool,
    pub requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_is_alive_with_no_requests() {
        let b = Backend::parse("http://127.0.0.1:8081").unwrap();
        assert!(b.is_alive());
        assert_eq!(b.requests(), 0);
        assert_eq!(b.authority(), "127.0.0.1:8081");
    }

    #[test]
    fn test_default_port_is_filled_in() {
        let b = Backend::parse("http://backend1").unwrap();
        assert_eq!(b.authority(), "backend1:80");
    }

    #[test]
    fn test_host_header_omits_default_port() {
        let b = Backend::parse("http://backend1").unwrap();
        assert_eq!(b.host_header(), "backend1");

        // An explicit default port is normalized away as well.
        let b = Backend::parse("http://backend1:80/api").unwrap();
        assert_eq!(b.host_header(), "backend1");
        assert_eq!(b.authority(), "backend1:80");

        let b = Backend::parse("http://10.0.0.1:8081").unwrap();
        assert_eq!(b.host_header(), "10.0.0.1:8081");
    }

    #[test]
    fn test_set_alive_returns_previous() {
        let b = Backend::parse("http://localhost:8081").unwrap();
        assert!(b.set_alive(false));
        assert!(!b.is_alive());
        assert!(!b.set_alive(true));
        assert!(b.is_alive());
    }

    #[test]
    fn test_record_request_concurrently() {
        let b = std::sync::Arc::new(Backend::parse("http://localhost:8081").unwrap());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let b = b.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        b.record_request();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(b.requests(), 8000);
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!(parse_backend_url("localhost:8081").is_err());
        assert!(parse_backend_url("https://localhost:8443").is_err());
        assert!(parse_backend_url("not a url").is_err());
        assert!(parse_backend_url("http://localhost:8081/?q=1").is_err());
    }

    #[test]
    fn test_status_snapshot() {
        let b = Backend::parse("http://localhost:8082").unwrap();
        b.record_request();
        b.set_alive(false);
        let status = b.status();
        assert_eq!(status.address, "http://localhost:8082/");
        assert!(!status.alive);
        assert_eq!(status.requests, 1);
    }
}
