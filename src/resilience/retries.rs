//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retried (idempotency, condition, classification, budget)
//! - Execute retries with exponential backoff + jitter
//! - Restart the budget when the auth layer replays a request after a refresh
//!
//! # Design Decisions
//! - POST/PATCH are retried only when explicitly marked safe
//! - Jittered backoff prevents thundering herd
//! - Retries are strictly sequential per logical request
//! - The 401 path belongs to the auth layer; it reports back through `Attempt`

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::config::RetryConfig;
use crate::errors::{ApiError, ErrorClassifier, RawFailure};
use crate::http::request::RequestDescriptor;
use crate::http::response::ApiResponse;
use crate::observability::metrics;
use crate::observability::{ErrorEvent, LogEntry, LogLevel, Logger};
use crate::resilience::backoff::{calculate_backoff, with_retry_after};
use crate::resilience::idempotency::is_retry_safe;

/// Outcome of a single dispatch as seen by the retry loop.
#[derive(Debug)]
pub enum Attempt {
    /// 2xx response.
    Success(ApiResponse),
    /// Failure eligible for classification and possibly a retry.
    Failed(RawFailure),
    /// The credential was refreshed; send the request again with a fresh budget.
    Replay,
    /// Terminal failure already classified upstream.
    Rejected(ApiError),
}

/// Sends one attempt of a request.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, request: &mut RequestDescriptor) -> Attempt;
}

/// Bookkeeping for one logical request once it has started retrying.
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub attempt_number: u32,
    pub total_attempts: u32,
    pub last_error: Option<ApiError>,
    pub start_time: Instant,
    pub last_attempt_time: Instant,
}

impl RetryContext {
    pub fn new(total_attempts: u32) -> Self {
        let now = Instant::now();
        Self {
            attempt_number: 1,
            total_attempts,
            last_error: None,
            start_time: now,
            last_attempt_time: now,
        }
    }

    /// Record a failed attempt.
    pub fn record_failure(&mut self, attempt: u32, error: ApiError) {
        self.attempt_number = attempt;
        self.last_error = Some(error);
        self.last_attempt_time = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Why a failure is not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The method/metadata does not allow repeating the request.
    NotIdempotent,
    /// The failure is outside the configured retryable conditions.
    ConditionNotRetryable,
    /// The classified error is permanent.
    ClassifiedPermanent,
    /// `max_attempts` reached.
    Exhausted,
}

impl GiveUpReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotIdempotent => "not_idempotent",
            Self::ConditionNotRetryable => "condition_not_retryable",
            Self::ClassifiedPermanent => "permanent",
            Self::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp(GiveUpReason),
}

/// Drives attempts of one logical request until success or a terminal error.
pub struct RetryCoordinator {
    config: RetryConfig,
    classifier: Arc<ErrorClassifier>,
    logger: Arc<dyn Logger>,
}

impl RetryCoordinator {
    pub fn new(config: RetryConfig, classifier: Arc<ErrorClassifier>, logger: Arc<dyn Logger>) -> Self {
        Self {
            config,
            classifier,
            logger,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Whether the raw failure is in the configured retryable set.
    pub fn matches_condition(&self, raw: &RawFailure) -> bool {
        match raw {
            RawFailure::Timeout { .. } => self.config.retry_on_timeout,
            RawFailure::Network { .. } => self.config.retry_on_network_error,
            RawFailure::Rejected { .. } => false,
            RawFailure::Http { status, .. } => self.config.retryable_status_codes.contains(status),
        }
    }

    /// Decide what to do after `request.attempt` failed with `raw` / `error`.
    pub fn decide(&self, request: &RequestDescriptor, raw: &RawFailure, error: &ApiError) -> RetryDecision {
        if !is_retry_safe(&request.method, &request.metadata) {
            return RetryDecision::GiveUp(GiveUpReason::NotIdempotent);
        }
        if !self.matches_condition(raw) {
            return RetryDecision::GiveUp(GiveUpReason::ConditionNotRetryable);
        }
        if !error.is_retryable() {
            return RetryDecision::GiveUp(GiveUpReason::ClassifiedPermanent);
        }
        if request.attempt >= self.config.max_attempts {
            return RetryDecision::GiveUp(GiveUpReason::Exhausted);
        }

        let retry_index = request.attempt.saturating_sub(1);
        let delay = calculate_backoff(retry_index, &self.config);
        let delay = match raw.status_code() {
            Some(429) | Some(503) if self.config.respect_retry_after => {
                with_retry_after(delay, raw.retry_after(), &self.config)
            }
            _ => delay,
        };
        RetryDecision::Retry(delay)
    }

    /// Run `request` through `dispatcher`, retrying transient failures.
    pub async fn execute<D>(&self, dispatcher: &D, request: &mut RequestDescriptor) -> Result<ApiResponse, ApiError>
    where
        D: Dispatch + ?Sized,
    {
        request.attempt = 1;
        let mut context: Option<RetryContext> = None;

        loop {
            let raw = match dispatcher.dispatch(request).await {
                Attempt::Success(response) => return Ok(response),
                Attempt::Replay => {
                    request.attempt = 1;
                    context = None;
                    continue;
                }
                Attempt::Rejected(error) => {
                    self.log_error(request, &error);
                    return Err(error);
                }
                Attempt::Failed(raw) => raw,
            };

            let error = self.classifier.classify(&raw);
            self.log_error(request, &error);

            let delay = match self.decide(request, &raw, &error) {
                RetryDecision::Retry(delay) => delay,
                RetryDecision::GiveUp(reason) => {
                    let mut entry = LogEntry::new(LogLevel::Debug, "Not retrying")
                        .correlation(request.correlation_id.as_str())
                        .field("reason", reason.as_str())
                        .field("attempt", request.attempt);
                    if let Some(ctx) = &context {
                        entry = entry.field("elapsed_ms", ctx.elapsed().as_millis());
                    }
                    self.logger.log(&entry);
                    return Err(error);
                }
            };

            let ctx = context.get_or_insert_with(|| RetryContext::new(self.config.max_attempts));
            ctx.record_failure(request.attempt, error.clone());

            self.logger.log(
                &LogEntry::new(LogLevel::Info, "Retry scheduled")
                    .correlation(request.correlation_id.as_str())
                    .field("attempt", request.attempt)
                    .field("max_attempts", ctx.total_attempts)
                    .field("code", error.code())
                    .field("delay_ms", delay.as_millis()),
            );
            metrics::record_retry(error.code().as_str());

            tokio::time::sleep(delay).await;
            request.attempt += 1;
        }
    }

    fn log_error(&self, request: &RequestDescriptor, error: &ApiError) {
        self.logger
            .log_error(&ErrorEvent::new(request.correlation_id.as_str(), request.attempt, error));
    }
}
