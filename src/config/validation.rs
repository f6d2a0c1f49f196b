//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, timeouts > 0, ports valid)
//! - Reject header values that would break the outbound header block
//!
//! Returns every problem found, not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `limits.max_line_bytes`.
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

impl std::error::Error for ValidationError {}

/// Check a parsed configuration for values the proxy cannot run with.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::new("listener.port", "must be non-zero"));
    }
    if config.listener.bind_host.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_host", "must not be empty"));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new(
            "listener.max_connections",
            "must be at least 1",
        ));
    }

    for (field, value) in [
        ("headers.user_agent", &config.headers.user_agent),
        ("headers.connection", &config.headers.connection),
        ("headers.proxy_connection", &config.headers.proxy_connection),
    ] {
        if value.contains(['\r', '\n']) {
            errors.push(ValidationError::new(field, "must not contain CR or LF"));
        }
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "must not be empty"));
        }
    }

    if config.limits.max_line_bytes == 0 {
        errors.push(ValidationError::new("limits.max_line_bytes", "must be at least 1"));
    }
    if config.limits.max_header_bytes < config.limits.max_line_bytes {
        errors.push(ValidationError::new(
            "limits.max_header_bytes",
            format!(
                "must be at least limits.max_line_bytes ({})",
                config.limits.max_line_bytes
            ),
        ));
    }

    if config.timeouts.connect_secs == Some(0) {
        errors.push(ValidationError::new(
            "timeouts.connect_secs",
            "must be positive when set",
        ));
    }
    if config.timeouts.idle_secs == Some(0) {
        errors.push(ValidationError::new("timeouts.idle_secs", "must be positive when set"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
