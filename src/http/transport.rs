//! The black-box request executor and its `reqwest` implementation.
//!
//! # Responsibilities
//! - Send one `RequestDescriptor` and return whatever the server answered
//! - Report "no response" outcomes as `TransportError`
//! - Own connection pooling, TLS, timeouts and base-URL resolution
//!
//! # Design Decisions
//! - Any HTTP status is `Ok`; only missing responses are errors
//! - One attempt per call; retrying is the pipeline's job

use async_trait::async_trait;
use url::Url;

use crate::config::TransportConfig;
use crate::errors::RawFailure;
use crate::http::request::RequestDescriptor;
use crate::http::response::ApiResponse;

/// Why no response was obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<TransportError> for RawFailure {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout(message) => RawFailure::timeout(message),
            TransportError::Network(message) => RawFailure::network(message),
            TransportError::InvalidRequest(message) => RawFailure::rejected(message),
        }
    }
}

/// Executes a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
    base_url: Option<Url>,
}

impl ReqwestTransport {
    /// Create a transport from configuration.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| TransportError::InvalidRequest(format!("invalid base URL: {}", e)))?;

        let inner = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { inner, base_url })
    }

    /// Wrap an existing client (custom TLS, proxies, ...).
    pub fn with_client(inner: reqwest::Client, base_url: Option<Url>) -> Self {
        Self { inner, base_url }
    }

    /// Absolute URL for a request, joining relative paths onto the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        match Url::parse(url) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base_url {
                Some(base) => base
                    .join(url)
                    .map_err(|e| TransportError::InvalidRequest(format!("cannot join `{}`: {}", url, e))),
                None => Err(TransportError::InvalidRequest(format!(
                    "relative URL `{}` without a base URL",
                    url
                ))),
            },
            Err(e) => Err(TransportError::InvalidRequest(format!("invalid URL `{}`: {}", url, e))),
        }
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Network(error.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse, TransportError> {
        let url = self.resolve(&request.url)?;

        let mut builder = self
            .inner
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        let mut api_response = ApiResponse::new(status, headers, body.to_vec());
        api_response.correlation_id = request.correlation_id.clone();
        Ok(api_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: Option<&str>) -> ReqwestTransport {
        let config = TransportConfig {
            base_url: base.map(str::to_string),
            ..Default::default()
        };
        ReqwestTransport::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let t = transport(Some("https://api.example.com/v1/"));
        assert_eq!(t.resolve("canvas/1").unwrap().as_str(), "https://api.example.com/v1/canvas/1");
        assert_eq!(t.resolve("/health").unwrap().as_str(), "https://api.example.com/health");
        assert_eq!(
            t.resolve("https://other.example.com/x").unwrap().as_str(),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_relative_without_base_is_invalid() {
        let t = transport(None);
        assert!(matches!(t.resolve("/canvas"), Err(TransportError::InvalidRequest(_))));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let config = TransportConfig {
            base_url: Some("::nope".into()),
            ..Default::default()
        };
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(TransportError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_errors_map_to_raw_failures() {
        let raw: RawFailure = TransportError::Timeout("t".into()).into();
        assert!(matches!(raw, RawFailure::Timeout { .. }));
        let raw: RawFailure = TransportError::Network("n".into()).into();
        assert!(matches!(raw, RawFailure::Network { .. }));
        let raw: RawFailure = TransportError::InvalidRequest("i".into()).into();
        assert!(matches!(raw, RawFailure::Rejected { .. }));
    }
}
