//! Credential attachment and 401 recovery.
//!
//! # Responsibilities
//! - Attach `Authorization: Bearer <token>` before every dispatch
//! - Turn a 401 into at most one refresh-and-replay per request
//! - Share one refresh between every request that hits a 401 meanwhile
//!
//! # Design Decisions
//! - A refreshed token travels with its request and beats the getter on replay
//! - A refresh that fails fails every waiter; nobody refreshes twice in one cycle
//! - The failure handler runs once per cycle, from the leader

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use reqwest::header::{HeaderValue, AUTHORIZATION};

use crate::auth::refresh::{Join, SingleFlight};
use crate::auth::token::{AuthFailureHandler, TokenGetter, TokenRefresher};
use crate::errors::{ApiError, ErrorClassifier, RawFailure};
use crate::http::request::RequestDescriptor;
use crate::observability::metrics;
use crate::observability::{LogEntry, LogLevel, Logger, NoopLogger};

/// What the pipeline should do after a 401.
#[derive(Debug)]
pub enum Recovery {
    /// A fresh token is on the descriptor; send it again.
    Replay,
    /// Give up with this error.
    Fail(ApiError),
}

/// Owns the credential collaborators and the per-client refresh state.
pub struct AuthCoordinator {
    getter: Option<Arc<dyn TokenGetter>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    failure_handler: Option<Arc<dyn AuthFailureHandler>>,
    classifier: Arc<ErrorClassifier>,
    logger: Arc<dyn Logger>,
    auto_refresh: bool,
    flight: SingleFlight,
    store: ArcSwapOption<String>,
}

impl AuthCoordinator {
    pub fn new(classifier: Arc<ErrorClassifier>) -> Self {
        Self {
            getter: None,
            refresher: None,
            failure_handler: None,
            classifier,
            logger: Arc::new(NoopLogger),
            auto_refresh: true,
            flight: SingleFlight::new(),
            store: ArcSwapOption::empty(),
        }
    }

    pub fn with_getter(mut self, getter: Arc<dyn TokenGetter>) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn with_failure_handler(mut self, handler: Arc<dyn AuthFailureHandler>) -> Self {
        self.failure_handler = Some(handler);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Token produced by the most recent successful refresh.
    pub fn current_token(&self) -> Option<String> {
        self.store.load_full().map(|token| token.as_ref().clone())
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.flight.is_in_flight()
    }

    pub fn pending_waiters(&self) -> usize {
        self.flight.waiter_count()
    }

    /// Set the `Authorization` header for the next dispatch of `request`.
    ///
    /// Without a getter the last refreshed token is used. No token means no header.
    pub async fn attach(&self, request: &mut RequestDescriptor) {
        let token = match (&request.refreshed_token, &self.getter) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(getter)) => getter.token().await,
            (None, None) => self.current_token(),
        };
        let Some(token) = token else {
            return;
        };

        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => tracing::warn!(
                correlation_id = %request.correlation_id,
                "Token is not a valid header value, sending request without it"
            ),
        }
    }

    /// Handle a 401 for `request`.
    pub async fn recover(&self, request: &mut RequestDescriptor, raw: &RawFailure) -> Recovery {
        let refresher = match &self.refresher {
            Some(refresher) if self.auto_refresh && !request.refresh_attempted => refresher,
            _ => {
                let error = self.classifier.classify(raw);
                self.notify_failure(&error);
                return Recovery::Fail(error);
            }
        };
        request.refresh_attempted = true;

        match self.flight.join() {
            Join::Waiter(rx) => {
                self.logger.log(
                    &LogEntry::new(LogLevel::Debug, "Waiting for in-flight token refresh")
                        .correlation(request.correlation_id.as_str()),
                );
                match rx.await {
                    Ok(Ok(token)) => {
                        request.refreshed_token = Some(token);
                        Recovery::Replay
                    }
                    Ok(Err(error)) => Recovery::Fail(error),
                    Err(_) => Recovery::Fail(ApiError::token_expired("token refresh abandoned")),
                }
            }
            Join::Leader(guard) => {
                self.logger.log(
                    &LogEntry::new(LogLevel::Info, "Refreshing token")
                        .correlation(request.correlation_id.as_str()),
                );

                let outcome = match refresher.refresh().await {
                    Ok(Some(token)) => Ok(token),
                    Ok(None) => Err(ApiError::token_expired("token refresher returned no token")),
                    Err(e) => Err(ApiError::token_expired(format!("token refresh failed: {}", e))),
                };

                match &outcome {
                    Ok(token) => {
                        self.store.store(Some(Arc::new(token.clone())));
                        metrics::record_refresh("success");
                    }
                    Err(error) => {
                        metrics::record_refresh("failure");
                        self.notify_failure(error);
                    }
                }

                let waiters = guard.settle(outcome.clone());
                self.logger.log(
                    &LogEntry::new(LogLevel::Info, "Token refresh settled")
                        .correlation(request.correlation_id.as_str())
                        .field("success", outcome.is_ok())
                        .field("waiters", waiters),
                );

                match outcome {
                    Ok(token) => {
                        request.refreshed_token = Some(token);
                        Recovery::Replay
                    }
                    Err(error) => Recovery::Fail(error),
                }
            }
        }
    }

    fn notify_failure(&self, error: &ApiError) {
        if let Some(handler) = &self.failure_handler {
            handler.on_auth_failure(error);
        }
    }
}
