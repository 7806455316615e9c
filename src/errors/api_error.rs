//! The typed failure record returned to every caller.
//!
//! # Responsibilities
//! - Define the closed error taxonomy (code, category, severity)
//! - Attach a fixed user-facing message to every code
//! - Provide one factory per error kind
//!
//! # Design Decisions
//! - One struct tagged by `ErrorCode`, not one type per kind
//! - The code alone decides category, severity, retryability and message
//! - Fields are private; an `ApiError` cannot change after construction

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Stable machine-readable error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Timeout,
    Network,
    TokenExpired,
    Unauthorized,
    Forbidden,
    InsufficientPermissions,
    Validation,
    BadRequest,
    NotFound,
    Conflict,
    RateLimitExceeded,
    ServiceUnavailable,
    ServerError,
    UnknownError,
}

/// Broad failure family, used to pick user-visible behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Network,
    Auth,
    Permission,
    Validation,
    Server,
    RateLimit,
    Client,
    Unknown,
}

/// How loudly a failure should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorCode {
    /// Wire representation of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Network => "NETWORK",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::Validation => "VALIDATION",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::ServerError => "SERVER_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Category this code belongs to.
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorCode::Timeout | ErrorCode::Network => ErrorCategory::Network,
            ErrorCode::TokenExpired | ErrorCode::Unauthorized => ErrorCategory::Auth,
            ErrorCode::Forbidden | ErrorCode::InsufficientPermissions => ErrorCategory::Permission,
            ErrorCode::Validation => ErrorCategory::Validation,
            ErrorCode::BadRequest | ErrorCode::NotFound | ErrorCode::Conflict => ErrorCategory::Client,
            ErrorCode::RateLimitExceeded => ErrorCategory::RateLimit,
            ErrorCode::ServiceUnavailable | ErrorCode::ServerError => ErrorCategory::Server,
            ErrorCode::UnknownError => ErrorCategory::Unknown,
        }
    }

    /// Severity this code is reported with.
    pub fn severity(self) -> Severity {
        match self {
            ErrorCode::Validation
            | ErrorCode::BadRequest
            | ErrorCode::NotFound
            | ErrorCode::Conflict => Severity::Low,
            ErrorCode::TokenExpired
            | ErrorCode::Forbidden
            | ErrorCode::InsufficientPermissions
            | ErrorCode::RateLimitExceeded
            | ErrorCode::UnknownError => Severity::Medium,
            ErrorCode::Timeout
            | ErrorCode::Network
            | ErrorCode::Unauthorized
            | ErrorCode::ServerError => Severity::High,
            ErrorCode::ServiceUnavailable => Severity::Critical,
        }
    }

    /// Whether a failure of this kind may succeed if repeated.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::Timeout
                | ErrorCode::Network
                | ErrorCode::TokenExpired
                | ErrorCode::RateLimitExceeded
                | ErrorCode::ServiceUnavailable
                | ErrorCode::ServerError
        )
    }

    /// Fixed message safe to show to an end user.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorCode::Timeout => "The request took too long. Please try again.",
            ErrorCode::Network => {
                "Unable to reach the server. Check your connection and try again."
            }
            ErrorCode::TokenExpired => "Your session has expired. Please sign in again.",
            ErrorCode::Unauthorized => "You need to sign in to continue.",
            ErrorCode::Forbidden => "You don't have access to this resource.",
            ErrorCode::InsufficientPermissions => {
                "You don't have permission to perform this action."
            }
            ErrorCode::Validation => "Some of the information you entered is invalid.",
            ErrorCode::BadRequest => "The request could not be processed.",
            ErrorCode::NotFound => "The requested resource could not be found.",
            ErrorCode::Conflict => "This change conflicts with the current state. Refresh and try again.",
            ErrorCode::RateLimitExceeded => "Too many requests. Please wait a moment and try again.",
            ErrorCode::ServiceUnavailable => {
                "The service is temporarily unavailable. Please try again shortly."
            }
            ErrorCode::ServerError => "Something went wrong on our end. Please try again.",
            ErrorCode::UnknownError => "An unexpected error occurred.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified API failure.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {user_message}")]
pub struct ApiError {
    code: ErrorCode,
    category: ErrorCategory,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<FieldErrors>,
    user_message: &'static str,
    original_error: String,
    timestamp: DateTime<Utc>,
}

impl ApiError {
    fn new(code: ErrorCode, status: Option<u16>, original_error: impl Into<String>) -> Self {
        Self {
            code,
            category: code.category(),
            severity: code.severity(),
            status,
            retryable: code.is_retryable(),
            details: None,
            user_message: code.user_message(),
            original_error: original_error.into(),
            timestamp: Utc::now(),
        }
    }

    fn with_details(mut self, details: Option<FieldErrors>) -> Self {
        self.details = details.filter(|d| !d.is_empty());
        self
    }

    /// The transport gave up waiting for a response.
    pub fn timeout(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, None, original)
    }

    /// A server answered 408 Request Timeout.
    pub fn request_timeout(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, Some(408), original)
    }

    /// No response was received.
    pub fn network(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, None, original)
    }

    /// The credential expired and could not be renewed.
    pub fn token_expired(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenExpired, Some(401), original)
    }

    pub fn unauthorized(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, Some(401), original)
    }

    pub fn forbidden(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, Some(403), original)
    }

    /// Local denial by the permission gate; nothing was sent.
    pub fn insufficient_permissions(required: impl Into<String>) -> Self {
        let required = required.into();
        let mut details = FieldErrors::new();
        details.insert("permission".to_string(), vec![required.clone()]);
        Self::new(
            ErrorCode::InsufficientPermissions,
            None,
            format!("missing required permission `{required}`"),
        )
        .with_details(Some(details))
    }

    pub fn validation(
        status: u16,
        details: Option<FieldErrors>,
        original: impl Into<String>,
    ) -> Self {
        Self::new(ErrorCode::Validation, Some(status), original).with_details(details)
    }

    pub fn bad_request(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, Some(400), original)
    }

    pub fn not_found(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, Some(404), original)
    }

    pub fn conflict(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, Some(409), original)
    }

    pub fn rate_limited(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimitExceeded, Some(429), original)
    }

    pub fn service_unavailable(original: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, Some(503), original)
    }

    pub fn server_error(status: u16, original: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServerError, Some(status), original)
    }

    /// Anything no other rule recognised.
    pub fn unknown(status: Option<u16>, original: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownError, status, original)
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn details(&self) -> Option<&FieldErrors> {
        self.details.as_ref()
    }

    pub fn user_message(&self) -> &str {
        self.user_message
    }

    /// Description of the raw failure this error was built from.
    pub fn original_error(&self) -> &str {
        &self.original_error
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Same error with the raw failure text rewritten, e.g. for redaction.
    pub fn map_original(mut self, f: impl FnOnce(&str) -> String) -> Self {
        self.original_error = f(&self.original_error);
        self
    }

    /// True when both errors describe the same failure, ignoring when it happened.
    pub fn same_kind(&self, other: &ApiError) -> bool {
        self.code == other.code
            && self.category == other.category
            && self.severity == other.severity
            && self.status == other.status
            && self.retryable == other.retryable
            && self.details == other.details
            && self.user_message == other.user_message
    }
}
