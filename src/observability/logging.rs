//! Structured logging.
//!
//! # Responsibilities
//! - Define the `Logger` observer the client reports every stage to
//! - Provide a no-op default and a `tracing`-backed implementation
//! - Carry only sanitized data in events
//!
//! # Design Decisions
//! - Observers return nothing; they cannot influence control flow
//! - Every method has a default no-op body so loggers implement only what they need
//! - Events are owned values so recording loggers can keep them

use std::time::Duration;

use serde_json::Value;

use crate::errors::ApiError;
use crate::http::request::RequestDescriptor;
use crate::observability::sanitize::{
    sanitize_body, sanitize_headers, sanitize_params, sanitize_text, sanitize_url,
};

/// Severity of a free-form log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// One dispatch leaving the client.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEvent {
    pub correlation_id: String,
    pub method: String,
    pub url: String,
    pub attempt: u32,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    /// Present only when body logging is on.
    pub body: Option<Value>,
}

impl RequestEvent {
    /// Sanitized snapshot of a descriptor about to be dispatched.
    pub fn from_descriptor(request: &RequestDescriptor, include_body: bool) -> Self {
        Self {
            correlation_id: request.correlation_id.clone(),
            method: request.method.to_string(),
            url: sanitize_url(&request.url),
            attempt: request.attempt,
            headers: sanitize_headers(&request.headers),
            params: sanitize_params(&request.params),
            body: if include_body {
                request.body.as_ref().map(sanitize_body)
            } else {
                None
            },
        }
    }
}

/// A response received for one dispatch, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEvent {
    pub correlation_id: String,
    pub status: u16,
    pub attempt: u32,
    pub duration: Duration,
}

/// A classified failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub correlation_id: String,
    pub attempt: u32,
    pub error: ApiError,
}

impl ErrorEvent {
    /// Event for `error` with URLs in its raw failure text sanitized.
    pub fn new(correlation_id: impl Into<String>, attempt: u32, error: &ApiError) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            attempt,
            error: error.clone().map_original(sanitize_text),
        }
    }
}

/// Timing for a whole logical operation.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceEvent {
    pub correlation_id: String,
    pub operation: String,
    pub duration: Duration,
    pub attempts: u32,
    pub success: bool,
}

/// Free-form entry (retry scheduled, refresh started, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub correlation_id: Option<String>,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            correlation_id: None,
            fields: Vec::new(),
        }
    }

    pub fn correlation(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn field(mut self, key: &'static str, value: impl ToString) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }
}

/// Side-channel observer of the request pipeline.
pub trait Logger: Send + Sync {
    fn log_request(&self, _event: &RequestEvent) {}

    fn log_response(&self, _event: &ResponseEvent) {}

    fn log_error(&self, _event: &ErrorEvent) {}

    fn log(&self, _entry: &LogEntry) {}

    fn log_performance(&self, _event: &PerformanceEvent) {}
}

/// Logger that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {}

/// Logger that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log_request(&self, event: &RequestEvent) {
        tracing::debug!(
            correlation_id = %event.correlation_id,
            method = %event.method,
            url = %event.url,
            attempt = event.attempt,
            headers = ?event.headers,
            params = ?event.params,
            body = ?event.body,
            "API request"
        );
    }

    fn log_response(&self, event: &ResponseEvent) {
        tracing::debug!(
            correlation_id = %event.correlation_id,
            status = event.status,
            attempt = event.attempt,
            duration_ms = event.duration.as_millis() as u64,
            "API response"
        );
    }

    fn log_error(&self, event: &ErrorEvent) {
        let error = &event.error;
        tracing::warn!(
            correlation_id = %event.correlation_id,
            attempt = event.attempt,
            code = %error.code(),
            category = ?error.category(),
            severity = ?error.severity(),
            status = ?error.status(),
            retryable = error.is_retryable(),
            original = %sanitize_text(error.original_error()),
            "API error"
        );
    }

    fn log(&self, entry: &LogEntry) {
        let correlation_id = entry.correlation_id.as_deref().unwrap_or("-");
        let fields = &entry.fields;
        match entry.level {
            LogLevel::Debug => tracing::debug!(correlation_id, ?fields, "{}", entry.message),
            LogLevel::Info => tracing::info!(correlation_id, ?fields, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(correlation_id, ?fields, "{}", entry.message),
            LogLevel::Error => tracing::error!(correlation_id, ?fields, "{}", entry.message),
        }
    }

    fn log_performance(&self, event: &PerformanceEvent) {
        let outcome = if event.success { "success" } else { "failure" };
        tracing::info!(
            correlation_id = %event.correlation_id,
            operation = %event.operation,
            attempts = event.attempts,
            duration_ms = event.duration.as_millis() as u64,
            outcome,
            "API call finished"
        );
    }
}
