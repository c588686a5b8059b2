//! Layer-7 round-robin load balancer library.

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use health::HealthChecker;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{Backend, ServerPool};
