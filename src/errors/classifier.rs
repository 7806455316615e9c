//! Raw failure classification.
//!
//! # Responsibilities
//! - Describe what the transport observed (`RawFailure`)
//! - Map every raw failure to exactly one `ApiError`
//! - Extract per-field validation details from error bodies
//!
//! # Design Decisions
//! - Total and deterministic: first matching rule wins, never fails
//! - The expired-vs-unauthorized split on 401 is injectable (`ExpiryMatcher`)

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::errors::api_error::{ApiError, FieldErrors};

/// What went wrong, as seen by the transport, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFailure {
    /// No response arrived before the deadline.
    Timeout { message: String },
    /// No response arrived for any other reason (refused, reset, DNS).
    Network { message: String },
    /// The request could not be built or sent at all.
    Rejected { message: String },
    /// The server answered with a non-success status.
    Http {
        status: u16,
        message: String,
        body: Option<Value>,
        retry_after: Option<Duration>,
    },
}

impl RawFailure {
    pub fn timeout(message: impl Into<String>) -> Self {
        RawFailure::Timeout { message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        RawFailure::Network { message: message.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        RawFailure::Rejected { message: message.into() }
    }

    /// Build a status failure with no body.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        RawFailure::Http {
            status,
            message: message.into(),
            body: None,
            retry_after: None,
        }
    }

    /// Attach a decoded response body. No-op for failures without a response.
    pub fn with_body(mut self, value: Value) -> Self {
        if let RawFailure::Http { body, .. } = &mut self {
            *body = Some(value);
        }
        self
    }

    /// Attach a server-provided `Retry-After` hint.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        if let RawFailure::Http { retry_after, .. } = &mut self {
            *retry_after = Some(delay);
        }
        self
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            RawFailure::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RawFailure::Timeout { message }
            | RawFailure::Network { message }
            | RawFailure::Rejected { message }
            | RawFailure::Http { message, .. } => message,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            RawFailure::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RawFailure::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawFailure::Timeout { message } => write!(f, "timeout: {}", message),
            RawFailure::Network { message } => write!(f, "network error: {}", message),
            RawFailure::Rejected { message } => write!(f, "request not sent: {}", message),
            RawFailure::Http { status, message, .. } => write!(f, "HTTP {}: {}", status, message),
        }
    }
}

/// Decides whether a 401 means "credential expired" rather than "not signed in".
#[derive(Clone)]
pub struct ExpiryMatcher {
    rule: Arc<dyn Fn(&RawFailure) -> bool + Send + Sync>,
}

impl ExpiryMatcher {
    /// Match when the message or body mentions any marker, ignoring case.
    pub fn markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers
            .into_iter()
            .map(|m| m.into().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();

        Self::custom(move |raw| {
            let message = raw.message().to_lowercase();
            let body = raw
                .body()
                .map(|b| b.to_string().to_lowercase())
                .unwrap_or_default();
            markers
                .iter()
                .any(|m| message.contains(m.as_str()) || body.contains(m.as_str()))
        })
    }

    /// Replace the heuristic entirely.
    pub fn custom<F>(rule: F) -> Self
    where
        F: Fn(&RawFailure) -> bool + Send + Sync + 'static,
    {
        Self { rule: Arc::new(rule) }
    }

    pub fn is_expired(&self, raw: &RawFailure) -> bool {
        (self.rule)(raw)
    }
}

impl Default for ExpiryMatcher {
    fn default() -> Self {
        Self::markers(["expired"])
    }
}

impl fmt::Debug for ExpiryMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiryMatcher").finish_non_exhaustive()
    }
}

/// Maps raw failures to `ApiError`s.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    expiry: ExpiryMatcher,
}

impl ErrorClassifier {
    pub fn new(expiry: ExpiryMatcher) -> Self {
        Self { expiry }
    }

    /// Classify a raw failure. First matching rule wins.
    pub fn classify(&self, raw: &RawFailure) -> ApiError {
        let original = raw.to_string();
        let (status, body) = match raw {
            RawFailure::Timeout { .. } => return ApiError::timeout(original),
            RawFailure::Network { .. } => return ApiError::network(original),
            RawFailure::Rejected { .. } => return ApiError::unknown(None, original),
            RawFailure::Http { status, body, .. } => (*status, body.as_ref()),
        };

        match status {
            401 if self.expiry.is_expired(raw) => ApiError::token_expired(original),
            401 => ApiError::unauthorized(original),
            403 => ApiError::forbidden(original),
            400 => match body.and_then(extract_field_errors) {
                Some(details) => ApiError::validation(400, Some(details), original),
                None => ApiError::bad_request(original),
            },
            404 => ApiError::not_found(original),
            408 => ApiError::request_timeout(original),
            409 => ApiError::conflict(original),
            422 => ApiError::validation(422, body.and_then(extract_field_errors), original),
            429 => ApiError::rate_limited(original),
            503 => ApiError::service_unavailable(original),
            s if s >= 500 => ApiError::server_error(s, original),
            s => ApiError::unknown(Some(s), original),
        }
    }
}

/// Pull `{"errors": {field: [msg]}}` (or `details`) out of an error body.
///
/// A single string per field is accepted as a one-element list.
pub fn extract_field_errors(body: &Value) -> Option<FieldErrors> {
    let fields = body
        .get("errors")
        .or_else(|| body.get("details"))?
        .as_object()?;

    let mut out = FieldErrors::new();
    for (field, messages) in fields {
        let messages: Vec<String> = match messages {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect(),
            _ => continue,
        };
        if !messages.is_empty() {
            out.insert(field.clone(), messages);
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}
