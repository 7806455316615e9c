//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::permissions::EndpointPermissionRule;

/// Root configuration for the API client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Retry and backoff settings.
    pub retry: RetryConfig,

    /// Credential handling.
    pub auth: AuthConfig,

    /// Observability settings.
    pub logging: LoggingConfig,

    /// Endpoint permission rules.
    pub permissions: PermissionConfig,

    /// Settings for the default HTTP transport.
    pub transport: TransportConfig,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per logical request, including the first.
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds.
    pub initial_delay_ms: u64,

    /// Growth factor applied per retry.
    pub backoff_multiplier: f64,

    /// Upper bound for any single delay in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 25% random jitter to each delay.
    pub use_jitter: bool,

    /// Response statuses worth retrying.
    pub retryable_status_codes: Vec<u16>,

    /// Retry when no response was received.
    pub retry_on_network_error: bool,

    /// Retry when the transport timed out.
    pub retry_on_timeout: bool,

    /// Honor `Retry-After` on 429/503 responses (still capped by `max_delay_ms`).
    pub respect_retry_after: bool,
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            use_jitter: true,
            retryable_status_codes: vec![408, 429, 500, 502, 503, 504],
            retry_on_network_error: true,
            retry_on_timeout: true,
            respect_retry_after: true,
        }
    }
}

/// Credential handling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Refresh the token and replay the request on a 401.
    pub auto_refresh: bool,

    /// Words that mark a 401 as an expired credential (case-insensitive).
    pub expiry_markers: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            expiry_markers: vec!["expired".to_string()],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Record request/response/error events.
    pub enabled: bool,

    /// Include sanitized request bodies in request events.
    pub log_bodies: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_bodies: false,
        }
    }
}

/// Ordered endpoint permission rules. First match wins.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PermissionConfig {
    pub rules: Vec<EndpointPermissionRule>,
}

/// Default transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL that relative request paths are joined onto.
    pub base_url: Option<String>,

    /// Request timeout (total time for request/response) in milliseconds.
    pub timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
            user_agent: format!("resilient-api-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
