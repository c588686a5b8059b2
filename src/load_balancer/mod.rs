//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (select_next)
//!     → round_robin.rs (scan from cursor, skip dead backends)
//!     → backend.rs (read liveness, count request)
//!     → Return backend or "no backend available"
//! ```
//!
//! # Design Decisions
//! - Registry membership fixed at startup; only backend state mutates
//! - Cursor guarded by a mutex, liveness by a per-backend RwLock,
//!   request counts by an atomic
//! - Dead backends skipped, never removed

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::{AddressError, Backend, BackendStatus};
pub use pool::ServerPool;
