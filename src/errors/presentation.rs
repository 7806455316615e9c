//! Turning surfaced errors into user-facing notices.
//!
//! The category decides the kind of notice; CRITICAL failures are also
//! escalated to an external reporter.

use std::sync::Arc;

use crate::errors::api_error::{ApiError, ErrorCategory, Severity};

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// What the UI should display for a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: &'static str,
    pub message: String,
    /// One `(field, message)` entry per validation message.
    pub field_messages: Vec<(String, String)>,
    /// Whether the user should be sent back to sign-in.
    pub requires_reauth: bool,
}

/// Build the notice for an error.
pub fn present(error: &ApiError) -> Notice {
    match error.category() {
        ErrorCategory::Auth => Notice {
            level: NoticeLevel::Warning,
            title: "Authentication required",
            message: error.user_message().to_string(),
            field_messages: Vec::new(),
            requires_reauth: true,
        },
        ErrorCategory::Permission => Notice {
            level: NoticeLevel::Warning,
            title: "Access denied",
            message: error.user_message().to_string(),
            field_messages: Vec::new(),
            requires_reauth: true,
        },
        ErrorCategory::Validation => Notice {
            level: NoticeLevel::Error,
            title: "Check your input",
            message: error.user_message().to_string(),
            field_messages: error
                .details()
                .map(|details| {
                    details
                        .iter()
                        .flat_map(|(field, msgs)| {
                            msgs.iter().map(move |m| (field.clone(), m.clone()))
                        })
                        .collect()
                })
                .unwrap_or_default(),
            requires_reauth: false,
        },
        ErrorCategory::Network | ErrorCategory::Server | ErrorCategory::RateLimit => Notice {
            level: NoticeLevel::Error,
            title: "Something went wrong",
            message: with_retry_hint(error.user_message()),
            field_messages: Vec::new(),
            requires_reauth: false,
        },
        ErrorCategory::Client | ErrorCategory::Unknown => Notice {
            level: NoticeLevel::Error,
            title: "Request failed",
            message: error.user_message().to_string(),
            field_messages: Vec::new(),
            requires_reauth: false,
        },
    }
}

fn with_retry_hint(message: &str) -> String {
    if message.contains("try again") {
        message.to_string()
    } else {
        format!("{} Please try again.", message)
    }
}

/// External sink for failures that need operator attention.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &ApiError);
}

/// Reporter that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &ApiError) {}
}

/// Presents errors and escalates critical ones.
#[derive(Clone)]
pub struct ErrorNotifier {
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorNotifier {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }

    /// Forward the error to the reporter if it is CRITICAL. Returns whether it was.
    pub fn escalate(&self, error: &ApiError) -> bool {
        if error.severity() == Severity::Critical {
            tracing::error!(code = %error.code(), status = ?error.status(), "Escalating critical API error");
            self.reporter.report(error);
            true
        } else {
            false
        }
    }

    /// Escalate if needed and build the notice.
    ///
    /// `ApiClient::execute` escalates on its own; use `ApiClient::present` for
    /// errors it returned.
    pub fn notify(&self, error: &ApiError) -> Notice {
        self.escalate(error);
        present(error)
    }
}

impl Default for ErrorNotifier {
    fn default() -> Self {
        Self::new(Arc::new(NoopReporter))
    }
}
