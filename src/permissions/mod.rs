//! Permission gate subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     EndpointPermissionRule[] (config, ordered)
//!     → matcher.rs (compile method/path matchers)
//!     → gate.rs (immutable PermissionGate)
//!
//! Per request:
//!     UserGetter → PermissionUser (or guest)
//!     → gate.rs (first matching rule → required permission)
//!     → model.rs (role permissions ∪ explicit grants)
//!     → allow, or INSUFFICIENT_PERMISSIONS without dispatch
//! ```

pub mod gate;
pub mod matcher;
pub mod model;

pub use gate::{PermissionGate, UserGetter};
pub use model::{role_permissions, EndpointPermissionRule, Permission, PermissionUser, Role};
