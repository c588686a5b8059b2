//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply env/CLI overrides)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; the backend list never changes afterwards
//! - All fields have defaults so an empty file is valid
//! - Validation reports every problem, and any problem is fatal

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError, ConfigOverrides};
pub use schema::{
    AdminConfig, BalancerConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
