//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span, timeout)
//!     → ServerPool::select_next
//!         → none alive: 503 Service Unavailable
//!     → proxy.rs (rewrite URI/Host, forward, stream response back)
//!         → upstream error: 502 Bad Gateway
//!     → Send to client
//! ```

pub mod proxy;
pub mod request_id;
pub mod server;

pub use request_id::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
