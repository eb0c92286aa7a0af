//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, timeouts > 0, addresses parse)
//! - Check the connection string is usable before any probe runs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs after file, environment and CLI layers are merged

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::GateConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check every field, collecting all problems.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.target.connection_string.as_deref().map(str::trim) {
        None | Some("") => errors.push(ValidationError::new(
            "target.connection_string",
            "no connection string configured",
        )),
        Some(_) => {
            if let Err(e) = config.descriptor() {
                errors.push(ValidationError::new("target.connection_string", e.to_string()));
            }
        }
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
    }

    if config.probe.timeout_secs == 0 {
        errors.push(ValidationError::new("probe.timeout_secs", "must be at least 1"));
    }

    if config.migrations.is_enabled() && config.migrations.command[0].trim().is_empty() {
        errors.push(ValidationError::new("migrations.command", "program name is empty"));
    }

    if config.status.enabled {
        if config.status.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "status.bind_address",
                format!("'{}' is not a socket address", config.status.bind_address),
            ));
        }
        if config.status.request_timeout_secs == 0 {
            errors.push(ValidationError::new("status.request_timeout_secs", "must be at least 1"));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
