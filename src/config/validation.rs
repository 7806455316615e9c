//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (attempts >= 1, delays ordered, statuses real)
//! - Check permission rule patterns and the transport base URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ClientConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use reqwest::Method;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `retry.max_attempts`.
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

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(ValidationError::new("retry.max_attempts", "must be at least 1"));
    }
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        errors.push(ValidationError::new(
            "retry.backoff_multiplier",
            "must be a finite number >= 1.0",
        ));
    }
    if retry.initial_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError::new(
            "retry.initial_delay_ms",
            format!("must not exceed retry.max_delay_ms ({})", retry.max_delay_ms),
        ));
    }
    for status in &retry.retryable_status_codes {
        if !(100..=599).contains(status) {
            errors.push(ValidationError::new(
                "retry.retryable_status_codes",
                format!("{} is not an HTTP status code", status),
            ));
        }
    }

    for (i, rule) in config.permissions.rules.iter().enumerate() {
        let field = format!("permissions.rules[{}]", i);
        if rule.method != "*" && Method::from_bytes(rule.method.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("{}.method", field),
                format!("`{}` is neither `*` nor an HTTP method", rule.method),
            ));
        }
        if rule.url != "*" && !rule.url.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.url", field),
                format!("`{}` must start with `/` or be `*`", rule.url),
            ));
        }
        if rule.url.len() > 1 && rule.url[..rule.url.len() - 1].contains('*') {
            errors.push(ValidationError::new(
                format!("{}.url", field),
                "wildcard is only allowed at the end of the pattern",
            ));
        }
    }

    let transport = &config.transport;
    if transport.timeout_ms == 0 {
        errors.push(ValidationError::new("transport.timeout_ms", "must be greater than 0"));
    }
    if transport.connect_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "transport.connect_timeout_ms",
            "must be greater than 0",
        ));
    }
    if let Some(base) = &transport.base_url {
        if let Err(e) = url::Url::parse(base) {
            errors.push(ValidationError::new(
                "transport.base_url",
                format!("`{}` is not a valid URL: {}", base, e),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
