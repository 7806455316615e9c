//! Error taxonomy subsystem.
//!
//! # Data Flow
//! ```text
//! Transport outcome (no response / non-2xx status)
//!     → classifier.rs (RawFailure → ApiError, first rule wins)
//!     → api_error.rs (immutable ApiError: code, category, severity, ...)
//!     → caller
//!     → presentation.rs (Notice for the UI, CRITICAL → ErrorReporter)
//! ```
//!
//! # Design Decisions
//! - The classifier never fails; every raw failure yields a typed value
//! - Codes own their category, severity and user message
//! - Retryability reported here is independent of whether a retry happens

pub mod api_error;
pub mod classifier;
pub mod presentation;

pub use api_error::{ApiError, ErrorCategory, ErrorCode, FieldErrors, Severity};
pub use classifier::{ErrorClassifier, ExpiryMatcher, RawFailure};
pub use presentation::{present, ErrorNotifier, ErrorReporter, Notice, NoticeLevel, NoopReporter};
