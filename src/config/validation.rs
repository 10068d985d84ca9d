//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges (window > 0, secret length)
//! - Detect redirect loops (login path must itself be public)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GateConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{GateConfig, DEV_TOKEN_SECRET, PLACEHOLDER_ADMIN_KEY};
use crate::gate::matcher::AllowList;

/// Minimum HS256 secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &GateConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_addr(&mut errors, "upstream.address", &config.upstream.address);

    for (i, path) in config.gate.public_paths.iter().enumerate() {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("gate.public_paths[{}]", i),
                format!("'{}' must start with '/'", path),
            ));
        }
    }

    let login = &config.gate.login_path;
    if !login.starts_with('/') {
        errors.push(ValidationError::new("gate.login_path", "must start with '/'"));
    } else if !AllowList::from_patterns(&config.gate.public_paths).is_public(login) {
        errors.push(ValidationError::new(
            "gate.login_path",
            format!("'{}' is not in gate.public_paths; visitors would loop on redirect", login),
        ));
    }

    if config.gate.redirect_param.is_empty() {
        errors.push(ValidationError::new("gate.redirect_param", "must not be empty"));
    }
    if config.gate.cookie_name.is_empty() {
        errors.push(ValidationError::new("gate.cookie_name", "must not be empty"));
    }

    let secret = &config.token.secret;
    if secret.is_empty() {
        errors.push(ValidationError::new("token.secret", "must not be empty"));
    } else if secret == DEV_TOKEN_SECRET {
        tracing::warn!("token.secret is the development default; set GATE_JWT_SECRET in production");
    } else if secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::new(
            "token.secret",
            format!("must be at least {} bytes", MIN_SECRET_LEN),
        ));
    }
    if config.token.ttl_secs <= 0 {
        errors.push(ValidationError::new("token.ttl_secs", "must be greater than 0"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
        }
        if config.rate_limit.sweep_interval_secs == 0 {
            errors.push(ValidationError::new(
                "rate_limit.sweep_interval_secs",
                "must be greater than 0",
            ));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "must be changed from the placeholder when the admin API is enabled",
            ));
        }
    }

    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("'{}' is not a valid socket address", value),
        ));
    }
}
