//! Configuration validation.
//!
//! Serde handles syntax; this checks values. Every problem is collected so
//! a bad config is reported in one go.

use std::net::SocketAddr;
use thiserror::Error;
use crate::config::schema::BalancerConfig;
use crate::load_balancer::backend::{parse_backend_url, AddressError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(transparent)]
    InvalidBackend(#[from] AddressError),

    #[error("no backends configured")]
    NoBackends,

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} '{value}' is not a valid socket address")]
    InvalidBindAddress { field: &'static str, value: String },
}

/// Check a configuration before anything is built from it.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    for address in &config.backends {
        if let Err(e) = parse_backend_url(address) {
            errors.push(e.into());
        }
    }

    let durations = [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    let mut binds = vec![("listener.bind_address", &config.listener.bind_address)];
    if config.admin.enabled {
        binds.push(("admin.bind_address", &config.admin.bind_address));
    }
    if config.observability.metrics_enabled {
        binds.push(("observability.metrics_address", &config.observability.metrics_address));
    }
    for (field, value) in binds {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidBindAddress {
                field,
                value: value.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
