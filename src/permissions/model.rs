//! Roles, permissions and endpoint rules.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role hierarchy. Ordering follows privilege: `Guest < User < ... < Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Premium,
    Moderator,
    Admin,
}

/// A single capability an endpoint can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "canvas:read")]
    CanvasRead,
    #[serde(rename = "canvas:write")]
    CanvasWrite,
    #[serde(rename = "canvas:delete")]
    CanvasDelete,
    #[serde(rename = "canvas:share")]
    CanvasShare,
    #[serde(rename = "canvas:export")]
    CanvasExport,
    #[serde(rename = "profile:read")]
    ProfileRead,
    #[serde(rename = "profile:write")]
    ProfileWrite,
    #[serde(rename = "billing:read")]
    BillingRead,
    #[serde(rename = "billing:manage")]
    BillingManage,
    #[serde(rename = "analytics:view")]
    AnalyticsView,
    #[serde(rename = "content:moderate")]
    ContentModerate,
    #[serde(rename = "admin:users")]
    UsersManage,
    #[serde(rename = "admin:settings")]
    SettingsManage,
}

impl Permission {
    pub const ALL: [Permission; 13] = [
        Permission::CanvasRead,
        Permission::CanvasWrite,
        Permission::CanvasDelete,
        Permission::CanvasShare,
        Permission::CanvasExport,
        Permission::ProfileRead,
        Permission::ProfileWrite,
        Permission::BillingRead,
        Permission::BillingManage,
        Permission::AnalyticsView,
        Permission::ContentModerate,
        Permission::UsersManage,
        Permission::SettingsManage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::CanvasRead => "canvas:read",
            Permission::CanvasWrite => "canvas:write",
            Permission::CanvasDelete => "canvas:delete",
            Permission::CanvasShare => "canvas:share",
            Permission::CanvasExport => "canvas:export",
            Permission::ProfileRead => "profile:read",
            Permission::ProfileWrite => "profile:write",
            Permission::BillingRead => "billing:read",
            Permission::BillingManage => "billing:manage",
            Permission::AnalyticsView => "analytics:view",
            Permission::ContentModerate => "content:moderate",
            Permission::UsersManage => "admin:users",
            Permission::SettingsManage => "admin:settings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known permission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission `{0}`")]
pub struct UnknownPermission(pub String);

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// Permissions granted by a role. Each role inherits everything below it.
pub fn role_permissions(role: Role) -> BTreeSet<Permission> {
    use Permission::*;

    let mut granted = BTreeSet::from([CanvasRead]);
    if role >= Role::User {
        granted.extend([CanvasWrite, CanvasDelete, CanvasShare, ProfileRead, ProfileWrite, BillingRead]);
    }
    if role >= Role::Premium {
        granted.extend([CanvasExport, AnalyticsView, BillingManage]);
    }
    if role >= Role::Moderator {
        granted.insert(ContentModerate);
    }
    if role >= Role::Admin {
        granted.extend([UsersManage, SettingsManage]);
    }
    granted
}

/// The caller, as far as permission checks are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionUser {
    pub id: String,
    pub role: Role,
    /// Grants on top of the role's own permissions.
    #[serde(default)]
    pub permissions: BTreeSet<Permission>,
}

impl PermissionUser {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            permissions: BTreeSet::new(),
        }
    }

    /// Add an explicit grant.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    /// Role permissions united with explicit grants.
    pub fn effective_permissions(&self) -> BTreeSet<Permission> {
        let mut set = role_permissions(self.role);
        set.extend(self.permissions.iter().copied());
        set
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission) || role_permissions(self.role).contains(&permission)
    }
}

/// "Requests matching `method` + `url` need `permission`."
///
/// `method` is an HTTP method or `*`. `url` is an exact path, or a prefix
/// when it ends in `*` (`/admin/*`). A lone `*` matches every path.
///
/// The prefix keeps its trailing slash, so `/admin/*` gates `/admin/users`
/// but not the bare `/admin`. Add an exact `/admin` rule to gate the root too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPermissionRule {
    pub method: String,
    pub url: String,
    pub permission: Permission,
}

impl EndpointPermissionRule {
    pub fn new(method: impl Into<String>, url: impl Into<String>, permission: Permission) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            permission,
        }
    }
}
