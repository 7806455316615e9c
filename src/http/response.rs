//! Response handling.
//!
//! # Responsibilities
//! - Hold the buffered response of a successful call
//! - Turn a non-success response into a `RawFailure` for classification
//! - Read the `Retry-After` hint
//!
//! # Design Decisions
//! - Bodies are buffered; callers decode with `json()` or `text()`
//! - Error messages prefer the server's `message`/`error` field over the reason phrase

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::RawFailure;

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Dispatches it took to obtain this response, refresh replays included.
    pub attempts: u32,
    pub correlation_id: String,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            attempts: 0,
            correlation_id: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `Retry-After` in seconds. HTTP-date values are ignored.
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// Describe this response as a failure.
    pub fn to_failure(&self) -> RawFailure {
        let body: Option<Value> = serde_json::from_slice(&self.body).ok();
        let message = body
            .as_ref()
            .and_then(|b| {
                b.get("message")
                    .or_else(|| b.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                let text = self.text();
                if text.trim().is_empty() || text.len() > 200 {
                    self.status
                        .canonical_reason()
                        .unwrap_or("Unknown status")
                        .to_string()
                } else {
                    text.trim().to_string()
                }
            });

        let mut failure = RawFailure::status(self.status.as_u16(), message);
        if let Some(body) = body {
            failure = failure.with_body(body);
        }
        if let Some(delay) = self.retry_after() {
            failure = failure.with_retry_after(delay);
        }
        failure
    }
}
