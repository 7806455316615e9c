//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Before dispatch:
//!     → coordinator.rs attach (refreshed token | TokenGetter | token store)
//!
//! On 401:
//!     → coordinator.rs recover
//!         → already refreshed / no refresher → classify, AuthFailureHandler, fail
//!         → refresh.rs join
//!             → leader: TokenRefresher → settle → waiters notified → replay
//!             → waiter: await leader's outcome → replay or fail
//! ```
//!
//! # Design Decisions
//! - One refresh in flight per client
//! - One refresh-and-replay per request
//! - Credentials never reach logs (headers are marked sensitive and sanitized)

pub mod coordinator;
pub mod refresh;
pub mod token;

pub use coordinator::{AuthCoordinator, Recovery};
pub use refresh::{Join, LeaderGuard, RefreshOutcome, SingleFlight};
pub use token::{refresh_fn, AuthFailureHandler, RefreshError, RefreshFn, TokenGetter, TokenRefresher};
