//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → probe.rs (TCP connect within timeout)
//!     → Backend::set_alive
//!     → TickReport published on a watch channel
//! ```
//!
//! # Design Decisions
//! - A single failed probe marks a backend dead; the next tick may revive it
//! - No retries within a tick, no hysteresis
//! - The request path never changes liveness

pub mod active;
pub mod probe;

pub use active::{HealthChecker, TickReport};
pub use probe::{Probe, TcpProbe};
