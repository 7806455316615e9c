//! Metrics collection.
//!
//! # Responsibilities
//! - Define client metrics (requests, latency, retries, refreshes, denials)
//! - Record through the `metrics` facade; the application installs an exporter
//!
//! # Metrics
//! - `api_client_requests_total` (counter): logical requests by method, outcome
//! - `api_client_request_duration_seconds` (histogram): end-to-end latency
//! - `api_client_attempts_total` (counter): individual dispatches by status
//! - `api_client_retries_total` (counter): scheduled retries by error code
//! - `api_client_token_refresh_total` (counter): refresh outcomes
//! - `api_client_permission_denied_total` (counter): local denials by permission
//!
//! # Design Decisions
//! - No recorder installed means every call is a no-op
//! - Labels stay low-cardinality (no URLs, no user ids)

use std::time::Duration;

/// Record a finished logical request.
pub fn record_request(method: &str, outcome: &str, duration: Duration) {
    metrics::counter!(
        "api_client_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("api_client_request_duration_seconds", "method" => method.to_string())
        .record(duration.as_secs_f64());
}

/// Record one dispatch. `status` is `0` when no response arrived.
pub fn record_attempt(status: u16) {
    metrics::counter!("api_client_attempts_total", "status" => status.to_string()).increment(1);
}

/// Record a scheduled retry.
pub fn record_retry(code: &str) {
    metrics::counter!("api_client_retries_total", "code" => code.to_string()).increment(1);
}

/// Record a token refresh outcome (`success`, `failure`, `abandoned`).
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("api_client_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a request denied by the permission gate.
pub fn record_permission_denied(permission: &str) {
    metrics::counter!(
        "api_client_permission_denied_total",
        "permission" => permission.to_string()
    )
    .increment(1);
}
