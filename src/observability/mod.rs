//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router + health checker produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID attached to every proxied request and its trace span
//! - Metric updates are fire-and-forget; with no recorder installed
//!   they are no-ops

pub mod logging;
pub mod metrics;
