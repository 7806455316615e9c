//! The request pipeline.
//!
//! # Responsibilities
//! - Wire gate, auth, retry and logging around a `Transport`
//! - Run one logical request end to end
//! - Escalate critical failures
//!
//! # Design Decisions
//! - One `ApiClient` owns one refresh state; clones share it
//! - Collaborators are trait objects injected through the builder
//! - Denied requests never reach the transport

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::Instrument;

use crate::auth::{AuthCoordinator, AuthFailureHandler, Recovery, TokenGetter, TokenRefresher};
use crate::config::{validate_config, ClientConfig, ConfigError};
use crate::errors::{
    present, ApiError, ErrorClassifier, ErrorNotifier, ErrorReporter, ExpiryMatcher, Notice,
};
use crate::http::request::{ApiRequest, RequestDescriptor};
use crate::http::response::ApiResponse;
use crate::http::transport::Transport;
use crate::observability::metrics;
use crate::observability::sanitize::sanitize_url;
use crate::observability::{
    ErrorEvent, Logger, NoopLogger, PerformanceEvent, RequestEvent, ResponseEvent, TracingLogger,
};
use crate::permissions::{PermissionGate, UserGetter};
use crate::resilience::{Attempt, Dispatch, RetryCoordinator};

struct ClientInner {
    transport: Arc<dyn Transport>,
    gate: PermissionGate,
    users: Option<Arc<dyn UserGetter>>,
    auth: AuthCoordinator,
    retry: RetryCoordinator,
    logger: Arc<dyn Logger>,
    notifier: ErrorNotifier,
    log_bodies: bool,
}

/// Resilient API client. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    pub fn builder(transport: Arc<dyn Transport>) -> ApiClientBuilder {
        ApiClientBuilder::new(transport)
    }

    /// Send `request` through the full pipeline.
    ///
    /// On success the response carries the number of dispatches it took.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut descriptor = RequestDescriptor::from(request);
        let span = tracing::info_span!(
            "api_request",
            correlation_id = %descriptor.correlation_id,
            method = %descriptor.method,
            url = %sanitize_url(&descriptor.url)
        );

        let started = Instant::now();
        let result = self.run(&mut descriptor).instrument(span).await;
        let duration = started.elapsed();

        let inner = &self.inner;
        metrics::record_request(
            descriptor.method.as_str(),
            if result.is_ok() { "success" } else { "failure" },
            duration,
        );
        inner.logger.log_performance(&PerformanceEvent {
            correlation_id: descriptor.correlation_id.clone(),
            operation: format!("{} {}", descriptor.method, sanitize_url(&descriptor.url)),
            duration,
            attempts: descriptor.dispatches,
            success: result.is_ok(),
        });

        match result {
            Ok(mut response) => {
                response.attempts = descriptor.dispatches;
                response.correlation_id = descriptor.correlation_id;
                Ok(response)
            }
            Err(error) => {
                inner.notifier.escalate(&error);
                Err(error)
            }
        }
    }

    async fn run(&self, descriptor: &mut RequestDescriptor) -> Result<ApiResponse, ApiError> {
        let inner = self.inner.as_ref();
        if let Err(error) = inner
            .gate
            .authorize(inner.users.as_deref(), &descriptor.method, &descriptor.url)
        {
            inner
                .logger
                .log_error(&ErrorEvent::new(descriptor.correlation_id.as_str(), 0, &error));
            return Err(error);
        }
        inner.retry.execute(inner, descriptor).await
    }

    /// Token produced by the most recent refresh.
    pub fn current_token(&self) -> Option<String> {
        self.inner.auth.current_token()
    }

    /// User-facing notice for an error returned by [`ApiClient::execute`].
    ///
    /// Critical errors were already escalated when `execute` surfaced them,
    /// so this only presents.
    pub fn present(&self, error: &ApiError) -> Notice {
        present(error)
    }
}

#[async_trait]
impl Dispatch for ClientInner {
    async fn dispatch(&self, request: &mut RequestDescriptor) -> Attempt {
        self.auth.attach(request).await;
        request.dispatches += 1;
        self.logger
            .log_request(&RequestEvent::from_descriptor(request, self.log_bodies));

        let started = Instant::now();
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                metrics::record_attempt(0);
                return Attempt::Failed(error.into());
            }
        };

        metrics::record_attempt(response.status.as_u16());
        self.logger.log_response(&ResponseEvent {
            correlation_id: request.correlation_id.clone(),
            status: response.status.as_u16(),
            attempt: request.attempt,
            duration: started.elapsed(),
        });

        if response.is_success() {
            return Attempt::Success(response);
        }

        let raw = response.to_failure();
        if response.status != StatusCode::UNAUTHORIZED {
            return Attempt::Failed(raw);
        }
        match self.auth.recover(request, &raw).await {
            Recovery::Replay => Attempt::Replay,
            Recovery::Fail(error) => Attempt::Rejected(error),
        }
    }
}

/// Assembles an [`ApiClient`].
pub struct ApiClientBuilder {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    token_getter: Option<Arc<dyn TokenGetter>>,
    token_refresher: Option<Arc<dyn TokenRefresher>>,
    failure_handler: Option<Arc<dyn AuthFailureHandler>>,
    user_getter: Option<Arc<dyn UserGetter>>,
    logger: Option<Arc<dyn Logger>>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    expiry: Option<ExpiryMatcher>,
}

impl ApiClientBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: ClientConfig::default(),
            token_getter: None,
            token_refresher: None,
            failure_handler: None,
            user_getter: None,
            logger: None,
            reporter: None,
            expiry: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn token_getter(mut self, getter: Arc<dyn TokenGetter>) -> Self {
        self.token_getter = Some(getter);
        self
    }

    pub fn token_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.token_refresher = Some(refresher);
        self
    }

    pub fn auth_failure_handler(mut self, handler: Arc<dyn AuthFailureHandler>) -> Self {
        self.failure_handler = Some(handler);
        self
    }

    pub fn user_getter(mut self, users: Arc<dyn UserGetter>) -> Self {
        self.user_getter = Some(users);
        self
    }

    /// Observer for pipeline events. Defaults to [`TracingLogger`].
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Replace the configured expiry markers with a custom rule.
    pub fn expiry_matcher(mut self, matcher: ExpiryMatcher) -> Self {
        self.expiry = Some(matcher);
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;
        let ClientConfig {
            retry,
            auth: auth_config,
            logging,
            permissions,
            transport: _,
        } = self.config;

        let expiry = self
            .expiry
            .unwrap_or_else(|| ExpiryMatcher::markers(auth_config.expiry_markers.iter()));
        let classifier = Arc::new(ErrorClassifier::new(expiry));

        let logger: Arc<dyn Logger> = if logging.enabled {
            self.logger.unwrap_or_else(|| Arc::new(TracingLogger))
        } else {
            Arc::new(NoopLogger)
        };

        let mut auth = AuthCoordinator::new(classifier.clone())
            .with_logger(logger.clone())
            .auto_refresh(auth_config.auto_refresh);
        if let Some(getter) = self.token_getter {
            auth = auth.with_getter(getter);
        }
        if let Some(refresher) = self.token_refresher {
            auth = auth.with_refresher(refresher);
        }
        if let Some(handler) = self.failure_handler {
            auth = auth.with_failure_handler(handler);
        }

        let notifier = self.reporter.map(ErrorNotifier::new).unwrap_or_default();

        tracing::debug!(
            max_attempts = retry.max_attempts,
            permission_rules = permissions.rules.len(),
            auto_refresh = auth_config.auto_refresh,
            "API client built"
        );

        Ok(ApiClient {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                gate: PermissionGate::new(&permissions.rules),
                users: self.user_getter,
                auth,
                retry: RetryCoordinator::new(retry, classifier, logger.clone()),
                logger,
                notifier,
                log_bodies: logging.log_bodies,
            }),
        })
    }
}
