//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Check backend-specific requirements (postgres needs a URL)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DynconfConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{DynconfConfig, StoreBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check a parsed config, collecting every problem found.
pub fn validate_config(config: &DynconfConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    if config.store.backend == StoreBackend::Postgres {
        if config.store.database_url.is_empty() {
            errors.push(ValidationError::new(
                "store.database_url",
                "required when backend = \"postgres\"",
            ));
        }
        if config.store.max_connections == 0 {
            errors.push(ValidationError::new("store.max_connections", "must be > 0"));
        }
    }

    if config.cache.refresh_interval_ms == 0 {
        errors.push(ValidationError::new("cache.refresh_interval_ms", "must be > 0"));
    }
    if config.cache.refresh_timeout_ms == 0 {
        errors.push(ValidationError::new("cache.refresh_timeout_ms", "must be > 0"));
    }
    if matches!(config.cache.default_service.as_deref(), Some("")) {
        errors.push(ValidationError::new(
            "cache.default_service",
            "must not be empty when set",
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if matches!(config.admin.api_key.as_deref(), Some("")) {
        errors.push(ValidationError::new("admin.api_key", "must not be empty when set"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
