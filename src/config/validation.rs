//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, ports valid)
//! - Check cross-field requirements (bearer mode needs an auth URI)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::{AppConfig, AuthMode};
use crate::security::crypto::HashAlgo;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn err(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Validate an [`AppConfig`], collecting every failure.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.name.trim().is_empty() {
        errors.push(err("app.name", "must not be empty"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(err("listener.bind_address", "not a valid socket address"));
    }
    if config.listener.max_connections == 0 {
        errors.push(err("listener.max_connections", "must be greater than zero"));
    }

    if config.http.max_body_bytes == 0 {
        errors.push(err("http.max_body_bytes", "must be greater than zero"));
    }
    if config.http.request_timeout_secs == 0 {
        errors.push(err("http.request_timeout_secs", "must be greater than zero"));
    }

    if config.auth.mode == AuthMode::Bearer && config.auth.auth_uri.trim().is_empty() {
        errors.push(err("auth.auth_uri", "required when auth.mode is bearer"));
    }
    if config.auth.hash_algo.parse::<HashAlgo>().is_err() {
        errors.push(err("auth.hash_algo", "must be sha256 or sha512"));
    }

    if config.sql.url.trim().is_empty() {
        errors.push(err("sql.url", "must not be empty"));
    }
    if config.sql.max_connections == 0 {
        errors.push(err("sql.max_connections", "must be greater than zero"));
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(err("rate_limit.window_secs", "must be greater than zero"));
        }
        if config.rate_limit.max_requests == 0 {
            errors.push(err("rate_limit.max_requests", "must be greater than zero"));
        }
        for ip in &config.rate_limit.exempt_ips {
            if ip.parse::<std::net::IpAddr>().is_err() {
                errors.push(err("rate_limit.exempt_ips", format!("invalid address: {ip}")));
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(err("observability.metrics_address", "not a valid socket address"));
    }

    if !config.smtp.host.is_empty() && config.smtp.from.trim().is_empty() {
        errors.push(err("smtp.from", "required when smtp.host is set"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
