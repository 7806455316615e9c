//! Resilient API Client Library

pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod permissions;
pub mod resilience;

pub use auth::{refresh_fn, AuthFailureHandler, RefreshError, TokenGetter, TokenRefresher};
pub use config::ClientConfig;
pub use errors::{ApiError, ErrorCategory, ErrorCode, Severity};
pub use http::{ApiClient, ApiClientBuilder, ApiRequest, ApiResponse, ReqwestTransport, Transport, TransportError};
pub use observability::{Logger, NoopLogger, TracingLogger};
pub use permissions::{EndpointPermissionRule, Permission, PermissionUser, Role, UserGetter};
