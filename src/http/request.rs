//! Request construction and per-operation state.
//!
//! # Responsibilities
//! - Build outbound requests (`ApiRequest`)
//! - Assign a correlation ID and send it as `x-request-id`
//! - Carry retry and refresh bookkeeping for one logical operation (`RequestDescriptor`)
//!
//! # Design Decisions
//! - Correlation ID assigned as early as possible for tracing
//! - Bodies are JSON values so every replay sends identical bytes
//! - The descriptor is mutated only by the pipeline that owns it

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Header carrying the caller's idempotency key.
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";

/// Caller hints that steer the pipeline but are not sent as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// `Some(true)` marks a POST/PATCH safe to repeat; `Some(false)` disables retries.
    pub retry_override: Option<bool>,
    pub correlation_id: Option<String>,
    /// Also marks the request safe to repeat.
    pub idempotency_key: Option<String>,
}

/// An outbound API call, as built by the caller.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    params: Vec<(String, String)>,
    body: Option<Value>,
    timeout: Option<Duration>,
    metadata: RequestMetadata,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            params: Vec::new(),
            body: None,
            timeout: None,
            metadata: RequestMetadata::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn options(url: impl Into<String>) -> Self {
        Self::new(Method::OPTIONS, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Per-request transport deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.correlation_id = Some(id.into());
        self
    }

    /// Mark the request safe to repeat and send the key to the server.
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.idempotency_key = Some(key.into());
        self
    }

    /// Force automatic retries on (`true`) or off (`false`).
    pub fn retry_override(mut self, allow: bool) -> Self {
        self.metadata.retry_override = Some(allow);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn metadata(&self) -> &RequestMetadata {
        &self.metadata
    }
}

/// One logical operation in flight: the request plus its retry/refresh state.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
    pub metadata: RequestMetadata,
    pub correlation_id: String,
    /// 1-based attempt number within the current retry cycle.
    pub attempt: u32,
    /// Dispatches made so far, across refresh replays.
    pub dispatches: u32,
    /// Set once a 401 has triggered a refresh for this request.
    pub refresh_attempted: bool,
    /// Credential obtained by a refresh; wins over the token getter on replay.
    pub refreshed_token: Option<String>,
}

impl From<ApiRequest> for RequestDescriptor {
    fn from(request: ApiRequest) -> Self {
        let ApiRequest {
            method,
            url,
            mut headers,
            params,
            body,
            timeout,
            metadata,
        } = request;

        let correlation_id = metadata
            .correlation_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        match HeaderValue::from_str(&correlation_id) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(X_REQUEST_ID), value);
            }
            Err(_) => tracing::warn!(correlation_id = %correlation_id, "Correlation ID is not a valid header value"),
        }

        if let Some(key) = &metadata.idempotency_key {
            match HeaderValue::from_str(key) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(IDEMPOTENCY_KEY), value);
                }
                Err(_) => tracing::warn!(correlation_id = %correlation_id, "Idempotency key is not a valid header value"),
            }
        }

        Self {
            method,
            url,
            headers,
            params,
            body,
            timeout,
            metadata,
            correlation_id,
            attempt: 0,
            dispatches: 0,
            refresh_attempted: false,
            refreshed_token: None,
        }
    }
}
