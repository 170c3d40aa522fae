//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, threshold > 0, addresses parse)
//! - Reject empty or duplicate handler names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Rule files are NOT checked here; they degrade at runtime instead

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;

/// Name reserved by the built-in health handler.
pub const HEALTH_HANDLER_NAME: &str = "health";

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("handler name must not be empty")]
    EmptyHandlerName,

    #[error("duplicate handler name `{0}`")]
    DuplicateHandlerName(String),
}

/// Check `config`, collecting every problem found.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.dispatch.breaker_threshold == 0 {
        errors.push(ValidationError::Zero("dispatch.breaker_threshold"));
    }
    if config.dispatch.default_timeout_ms == 0 {
        errors.push(ValidationError::Zero("dispatch.default_timeout_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("listener.max_body_bytes"));
    }

    let mut names = HashSet::new();
    if config.handlers.health {
        names.insert(HEALTH_HANDLER_NAME.to_string());
    }
    let mut check_name = |name: &str| {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyHandlerName);
        } else if !names.insert(name.to_string()) {
            errors.push(ValidationError::DuplicateHandlerName(name.to_string()));
        }
    };
    for redirect in &config.handlers.redirects {
        check_name(&redirect.name);
    }
    if let Some(hosts) = &config.handlers.hosts {
        check_name(&hosts.name);
    }

    for redirect in &config.handlers.redirects {
        if redirect.timeout_ms == Some(0) {
            errors.push(ValidationError::Zero("handlers.redirects.timeout_ms"));
        }
    }
    if let Some(hosts) = &config.handlers.hosts {
        if hosts.timeout_ms == 0 {
            errors.push(ValidationError::Zero("handlers.hosts.timeout_ms"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
