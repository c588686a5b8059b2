//! Reachability probes.

use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use crate::load_balancer::Backend;

/// A bounded-duration check of one backend.
///
/// `true` means reachable. Failures are outcomes, not errors.
pub trait Probe: Send + Sync + 'static {
    fn probe(&self, backend: &Backend) -> impl Future<Output = bool> + Send;
}

/// Opens a TCP connection to the backend and closes it straight away.
#[derive(Debug, Clone, Copy)]
pub struct TcpProbe {
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Probe for TcpProbe {
    async fn probe(&self, backend: &Backend) -> bool {
        let addr = backend.authority();
        match time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(addr = %addr, error = %e, "Probe failed: connection error");
                false
            }
            Err(_) => {
                tracing::debug!(addr = %addr, timeout = ?self.timeout, "Probe failed: timeout");
                false
            }
        }
    }
}
