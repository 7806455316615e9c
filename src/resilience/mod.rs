//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Failed attempt:
//!     → errors::classifier (raw failure → ApiError)
//!     → idempotency.rs (may this request be repeated at all?)
//!     → retries.rs (condition set, classification, attempt budget)
//!     → backoff.rs (exponential delay + jitter, Retry-After)
//!     → sleep, re-dispatch with attempt + 1
//! ```
//!
//! # Design Decisions
//! - Timeouts belong to the transport; every dispatch has a deadline there
//! - Retries only for requests that are safe to repeat
//! - The retry loop never sees 401 recovery, only its outcome

pub mod backoff;
pub mod idempotency;
pub mod retries;

pub use backoff::calculate_backoff;
pub use idempotency::is_retry_safe;
pub use retries::{Attempt, Dispatch, GiveUpReason, RetryContext, RetryCoordinator, RetryDecision};
