//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline stages produce:
//!     → sanitize.rs (strip credentials from headers, bodies, URLs)
//!     → logging.rs (Logger events: request, response, error, log, performance)
//!     → metrics.rs (counters, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → TracingLogger (tracing subscriber installed by the application)
//!     → custom Logger implementations (telemetry sinks)
//! ```
//!
//! # Design Decisions
//! - Correlation ID flows through every event of a logical request
//! - Loggers observe; they never alter control flow
//! - No-op logger is the fallback when logging is disabled

pub mod logging;
pub mod metrics;
pub mod sanitize;

pub use logging::{
    ErrorEvent, LogEntry, LogLevel, Logger, NoopLogger, PerformanceEvent, RequestEvent,
    ResponseEvent, TracingLogger,
};
