//! Pre-dispatch permission checks.
//!
//! # Responsibilities
//! - Compile endpoint rules into matchers once
//! - Find the permission a request needs (first matching rule)
//! - Deny locally, before any network I/O, when the caller lacks it
//!
//! # Design Decisions
//! - No matching rule means no requirement at this layer (default allow)
//! - A missing user is checked as a guest
//! - This is a fast-fail UX check; the server stays authoritative

use reqwest::Method;

use crate::errors::ApiError;
use crate::observability::metrics;
use crate::permissions::matcher::{request_path, AndMatcher, Matcher, MethodMatcher, PathMatcher};
use crate::permissions::model::{EndpointPermissionRule, Permission, PermissionUser, Role};

/// Supplies the current caller on every request.
pub trait UserGetter: Send + Sync {
    fn current_user(&self) -> Option<PermissionUser>;
}

impl<F> UserGetter for F
where
    F: Fn() -> Option<PermissionUser> + Send + Sync,
{
    fn current_user(&self) -> Option<PermissionUser> {
        self()
    }
}

#[derive(Debug)]
struct CompiledRule {
    matcher: AndMatcher,
    permission: Permission,
    pattern: String,
}

/// Ordered, immutable set of compiled endpoint rules.
#[derive(Debug, Default)]
pub struct PermissionGate {
    rules: Vec<CompiledRule>,
}

impl PermissionGate {
    /// Compile rules, preserving their order.
    pub fn new(rules: &[EndpointPermissionRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CompiledRule {
                matcher: AndMatcher::new(vec![
                    Box::new(MethodMatcher::new(&rule.method)),
                    Box::new(PathMatcher::new(&rule.url)),
                ]),
                permission: rule.permission,
                pattern: format!("{} {}", rule.method, rule.url),
            })
            .collect();
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Permission required by the first matching rule, if any.
    pub fn required_permission(&self, method: &Method, url: &str) -> Option<Permission> {
        let path = request_path(url);
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(method, &path))
            .map(|rule| rule.permission)
    }

    /// Allow or deny a request for the given caller.
    pub fn check(
        &self,
        user: Option<&PermissionUser>,
        method: &Method,
        url: &str,
    ) -> Result<(), ApiError> {
        let path = request_path(url);
        let Some(rule) = self.rules.iter().find(|r| r.matcher.matches(method, &path)) else {
            return Ok(());
        };

        let allowed = match user {
            Some(user) => user.has_permission(rule.permission),
            None => PermissionUser::new("anonymous", Role::Guest).has_permission(rule.permission),
        };

        if allowed {
            return Ok(());
        }

        tracing::warn!(
            user_id = user.map(|u| u.id.as_str()).unwrap_or("anonymous"),
            role = ?user.map(|u| u.role).unwrap_or(Role::Guest),
            rule = %rule.pattern,
            permission = %rule.permission,
            method = %method,
            path = %path,
            "Request denied by permission gate"
        );
        metrics::record_permission_denied(rule.permission.as_str());
        Err(ApiError::insufficient_permissions(rule.permission.as_str()))
    }

    /// Check using the caller reported by a `UserGetter`.
    pub fn authorize(
        &self,
        users: Option<&dyn UserGetter>,
        method: &Method,
        url: &str,
    ) -> Result<(), ApiError> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let user = users.and_then(|u| u.current_user());
        self.check(user.as_ref(), method, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn gate() -> PermissionGate {
        PermissionGate::new(&[
            EndpointPermissionRule::new("*", "/admin/*", Permission::UsersManage),
            EndpointPermissionRule::new("DELETE", "/canvas/*", Permission::CanvasDelete),
            EndpointPermissionRule::new("GET", "/canvas/*", Permission::CanvasRead),
            EndpointPermissionRule::new("*", "/canvas/*", Permission::CanvasWrite),
            EndpointPermissionRule::new("GET", "/analytics", Permission::AnalyticsView),
        ])
    }

    #[test]
    fn test_admin_prefix_with_wildcard_method() {
        let gate = gate();
        let user = PermissionUser::new("u", Role::User);
        let admin = PermissionUser::new("a", Role::Admin);

        let err = gate.check(Some(&user), &Method::GET, "/admin/users").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientPermissions);
        assert!(!err.is_retryable());

        assert!(gate.check(Some(&admin), &Method::GET, "/admin/users").is_ok());
        assert!(gate.check(Some(&admin), &Method::POST, "/admin/settings").is_ok());
    }

    #[test]
    fn test_prefix_rule_leaves_bare_root_open() {
        let user = PermissionUser::new("u", Role::User);
        assert!(gate().check(Some(&user), &Method::GET, "/admin").is_ok());

        let gate = PermissionGate::new(&[
            EndpointPermissionRule::new("*", "/admin", Permission::UsersManage),
            EndpointPermissionRule::new("*", "/admin/*", Permission::UsersManage),
        ]);
        assert!(gate.check(Some(&user), &Method::GET, "/admin").is_err());
        assert!(gate.check(Some(&user), &Method::GET, "/admin/users").is_err());
    }

    #[test]
    fn test_unconfigured_path_is_allowed_for_everyone() {
        let gate = gate();
        for role in [Role::Guest, Role::User, Role::Premium, Role::Moderator, Role::Admin] {
            let user = PermissionUser::new("x", role);
            assert!(gate.check(Some(&user), &Method::POST, "/feedback").is_ok());
        }
        assert!(gate.check(None, &Method::DELETE, "/feedback").is_ok());
    }

    #[test]
    fn test_first_match_wins() {
        let gate = gate();
        assert_eq!(
            gate.required_permission(&Method::DELETE, "/canvas/7"),
            Some(Permission::CanvasDelete)
        );
        assert_eq!(
            gate.required_permission(&Method::GET, "/canvas/7"),
            Some(Permission::CanvasRead)
        );
        assert_eq!(
            gate.required_permission(&Method::PATCH, "/canvas/7"),
            Some(Permission::CanvasWrite)
        );
        assert_eq!(gate.required_permission(&Method::GET, "/canvas"), None);
    }

    #[test]
    fn test_explicit_grant_satisfies_rule() {
        let gate = gate();
        let user = PermissionUser::new("u", Role::User);
        assert!(gate.check(Some(&user), &Method::GET, "/analytics").is_err());

        let granted = user.with_permission(Permission::AnalyticsView);
        assert!(gate.check(Some(&granted), &Method::GET, "/analytics").is_ok());
    }

    #[test]
    fn test_missing_user_is_a_guest() {
        let gate = gate();
        assert!(gate.check(None, &Method::GET, "/canvas/1").is_ok());
        assert!(gate.check(None, &Method::PUT, "/canvas/1").is_err());
    }

    #[test]
    fn test_absolute_urls_and_queries() {
        let gate = gate();
        let user = PermissionUser::new("u", Role::User);
        assert!(gate
            .check(Some(&user), &Method::GET, "https://api.example.com/admin/users?page=1")
            .is_err());
        assert!(gate
            .check(Some(&user), &Method::GET, "https://api.example.com/analytics?range=7d")
            .is_err());
    }

    #[test]
    fn test_authorize_uses_user_getter() {
        let gate = gate();
        let admin = || Some(PermissionUser::new("a", Role::Admin));
        let nobody = || None::<PermissionUser>;

        assert!(gate.authorize(Some(&admin), &Method::DELETE, "/admin/users/3").is_ok());
        assert!(gate.authorize(Some(&nobody), &Method::DELETE, "/admin/users/3").is_err());
        assert!(gate.authorize(None, &Method::DELETE, "/admin/users/3").is_err());
        assert!(PermissionGate::default()
            .authorize(None, &Method::DELETE, "/admin/users/3")
            .is_ok());
    }
}
