//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → consumed once by ApiClientBuilder / ReqwestTransport
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; a new client is built to change it
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AuthConfig, ClientConfig, LoggingConfig, PermissionConfig, RetryConfig, TransportConfig};
pub use validation::{validate_config, ValidationError};
