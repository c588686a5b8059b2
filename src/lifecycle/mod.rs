//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build pool → Start health checker → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop health checks → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Shutdown is a token handed to each task, never global state
//! - Listeners start last (traffic only once the pool is built)
//! - Draining has a deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
