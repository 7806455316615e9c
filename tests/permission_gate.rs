//! Local permission checks in front of the transport.

use std::sync::{Arc, Mutex};

use resilient_api_client::config::parse_config;
use resilient_api_client::errors::{ErrorCategory, ErrorCode};
use resilient_api_client::{ApiClient, ApiRequest, Permission, PermissionUser, Role, UserGetter};

mod common;
use common::{response, MockTransport, RecordingLogger};

const RULES: &str = r#"
[[permissions.rules]]
method = "*"
url = "/admin/*"
permission = "admin:users"

[[permissions.rules]]
method = "DELETE"
url = "/canvas/*"
permission = "canvas:delete"

[[permissions.rules]]
method = "get"
url = "/analytics/*"
permission = "analytics:view"
"#;

struct SwitchableUser(Mutex<Option<PermissionUser>>);

impl UserGetter for SwitchableUser {
    fn current_user(&self) -> Option<PermissionUser> {
        self.0.lock().unwrap().clone()
    }
}

fn setup(user: Option<PermissionUser>) -> (ApiClient, Arc<MockTransport>, Arc<SwitchableUser>) {
    let transport = MockTransport::sequence(vec![Ok(response(200, r#"{"ok":true}"#))]);
    let users = Arc::new(SwitchableUser(Mutex::new(user)));
    let client = ApiClient::builder(transport.clone())
        .config(parse_config(RULES).unwrap())
        .user_getter(users.clone())
        .build()
        .unwrap();
    (client, transport, users)
}

#[tokio::test]
async fn test_user_denied_admin_endpoint_without_dispatch() {
    let (client, transport, _) = setup(Some(PermissionUser::new("u-1", Role::User)));

    let error = client
        .execute(ApiRequest::post("/admin/users").retry_override(true))
        .await
        .unwrap_err();

    assert_eq!(error.code(), ErrorCode::InsufficientPermissions);
    assert_eq!(error.category(), ErrorCategory::Permission);
    assert!(!error.is_retryable());
    assert_eq!(error.details().unwrap()["permission"], vec!["admin:users".to_string()]);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_admin_allowed() {
    let (client, transport, _) = setup(Some(PermissionUser::new("a-1", Role::Admin)));

    let result = client.execute(ApiRequest::get("/admin/settings")).await.unwrap();
    assert_eq!(result.status.as_u16(), 200);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test]
async fn test_unconfigured_path_allowed_for_guest() {
    let (client, transport, _) = setup(None);

    client.execute(ApiRequest::get("/canvas/1")).await.unwrap();
    client.execute(ApiRequest::get("/public/feed")).await.unwrap();
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_missing_user_checked_as_guest() {
    let (client, transport, _) = setup(None);

    let error = client.execute(ApiRequest::delete("/canvas/1")).await.unwrap_err();
    assert_eq!(error.code(), ErrorCode::InsufficientPermissions);
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn test_explicit_grant_and_user_switch() {
    let (client, transport, users) = setup(Some(PermissionUser::new("u-2", Role::User)));

    let denied = client.execute(ApiRequest::get("/analytics/daily")).await;
    assert!(denied.is_err());

    *users.0.lock().unwrap() =
        Some(PermissionUser::new("u-2", Role::User).with_permission(Permission::AnalyticsView));
    client.execute(ApiRequest::get("/analytics/daily")).await.unwrap();

    *users.0.lock().unwrap() = Some(PermissionUser::new("p-1", Role::Premium));
    client
        .execute(ApiRequest::get("https://api.example.com/analytics/weekly?range=7d"))
        .await
        .unwrap();

    assert_eq!(transport.call_count(), 2);
}

#[tokio::test]
async fn test_denial_logged() {
    let transport = MockTransport::sequence(vec![Ok(response(200, ""))]);
    let logger = Arc::new(RecordingLogger::default());
    let client = ApiClient::builder(transport.clone())
        .config(parse_config(RULES).unwrap())
        .user_getter(Arc::new(|| Some(PermissionUser::new("u-3", Role::Moderator))))
        .logger(logger.clone())
        .build()
        .unwrap();

    client.execute(ApiRequest::delete("/admin/users/7")).await.unwrap_err();

    let errors = logger.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].attempt, 0);
    assert_eq!(errors[0].error.code(), ErrorCode::InsufficientPermissions);
    assert!(logger.requests.lock().unwrap().is_empty());
}
