//! HTTP request pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! ApiRequest
//!     → request.rs (descriptor, correlation ID, idempotency key)
//!     → client.rs (permission gate, deny before any I/O)
//!     → resilience::retries (attempt loop)
//!         → auth::coordinator attach (Authorization header)
//!         → transport.rs (one HTTP exchange)
//!         → response.rs (2xx → ApiResponse, else RawFailure)
//!         → 401 → auth::coordinator recover (refresh, replay)
//!     → ApiResponse | ApiError
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder};
pub use request::{ApiRequest, RequestDescriptor, RequestMetadata, IDEMPOTENCY_KEY, X_REQUEST_ID};
pub use response::ApiResponse;
pub use transport::{ReqwestTransport, Transport, TransportError};
