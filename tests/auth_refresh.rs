//! Token refresh coordination through the client.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use resilient_api_client::config::{ClientConfig, RetryConfig};
use resilient_api_client::errors::ErrorCode;
use resilient_api_client::{refresh_fn, ApiClient, ApiError, ApiRequest, RefreshError, TokenRefresher};

mod common;
use common::{response, MockTransport};

/// Server that accepts only `Bearer <valid>` and reports expiry otherwise.
fn token_checking_transport(valid: Arc<Mutex<String>>) -> Arc<MockTransport> {
    MockTransport::new(move |request, _| {
        let expected = format!("Bearer {}", valid.lock().unwrap());
        match request.headers.get("authorization").and_then(|v| v.to_str().ok()) {
            Some(header) if header == expected => Ok(response(200, r#"{"ok":true}"#)),
            _ => Ok(response(401, r#"{"message":"Token expired"}"#)),
        }
    })
}

fn slow_refresher(calls: Arc<AtomicU32>, result: Result<Option<String>, RefreshError>) -> Arc<dyn TokenRefresher> {
    Arc::new(refresh_fn(move || {
        let calls = calls.clone();
        let result = result.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            result
        }
    }))
}

fn config() -> ClientConfig {
    ClientConfig {
        retry: RetryConfig {
            initial_delay_ms: 10,
            use_jitter: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_expiry_single_refresh() {
    let valid = Arc::new(Mutex::new("t2".to_string()));
    let transport = token_checking_transport(valid);
    let refreshes = Arc::new(AtomicU32::new(0));

    let client = ApiClient::builder(transport.clone())
        .config(config())
        .token_getter(Arc::new(|| Some("t1".to_string())))
        .token_refresher(slow_refresher(refreshes.clone(), Ok(Some("t2".into()))))
        .build()
        .unwrap();

    let requests = (0..5).map(|i| {
        let client = client.clone();
        async move { client.execute(ApiRequest::get(format!("/canvas/{}", i))).await }
    });
    let results = join_all(requests).await;

    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    for result in results {
        let response = result.unwrap();
        assert_eq!(response.status.as_u16(), 200);
        assert_eq!(response.attempts, 2);
    }

    let calls = transport.calls();
    assert_eq!(calls.len(), 10);
    let replayed: Vec<_> = calls
        .iter()
        .filter(|c| c.authorization.as_deref() == Some("Bearer t2"))
        .collect();
    assert_eq!(replayed.len(), 5);
    assert_eq!(client.current_token().as_deref(), Some("t2"));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_failure_fails_all_then_next_cycle_works() {
    let valid = Arc::new(Mutex::new("t2".to_string()));
    let transport = token_checking_transport(valid);
    let refreshes = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(AtomicU32::new(0));

    let counter = refreshes.clone();
    let refresher = refresh_fn(move || {
        let counter = counter.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            if n == 0 {
                Err(RefreshError::Unavailable("identity provider down".into()))
            } else {
                Ok(Some("t2".to_string()))
            }
        }
    });
    let handler_count = failures.clone();
    let client = ApiClient::builder(transport.clone())
        .config(config())
        .token_getter(Arc::new(|| Some("t1".to_string())))
        .token_refresher(Arc::new(refresher))
        .auth_failure_handler(Arc::new(move |_: &ApiError| {
            handler_count.fetch_add(1, Ordering::SeqCst);
        }))
        .build()
        .unwrap();

    let requests = (0..3).map(|_| {
        let client = client.clone();
        async move { client.execute(ApiRequest::get("/canvas")).await }
    });
    for result in join_all(requests).await {
        let error = result.unwrap_err();
        assert_eq!(error.code(), ErrorCode::TokenExpired);
    }
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(transport.call_count(), 3);

    let response = client.execute(ApiRequest::get("/canvas")).await.unwrap();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(refreshes.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_401_after_replay_terminates() {
    // The server never accepts anything, so the replay fails too.
    let valid = Arc::new(Mutex::new("nothing-matches".to_string()));
    let transport = token_checking_transport(valid);
    let refreshes = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(Mutex::new(Vec::new()));

    let seen = failures.clone();
    let client = ApiClient::builder(transport.clone())
        .config(config())
        .token_refresher(slow_refresher(refreshes.clone(), Ok(Some("t2".into()))))
        .auth_failure_handler(Arc::new(move |e: &ApiError| {
            seen.lock().unwrap().push(e.code());
        }))
        .build()
        .unwrap();

    let error = client.execute(ApiRequest::get("/canvas")).await.unwrap_err();

    assert_eq!(error.code(), ErrorCode::TokenExpired);
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(transport.call_count(), 2);
    assert_eq!(*failures.lock().unwrap(), vec![ErrorCode::TokenExpired]);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_without_refresher_terminates() {
    let transport = MockTransport::sequence(vec![Ok(response(401, r#"{"message":"Invalid credentials"}"#))]);
    let client = ApiClient::builder(transport.clone())
        .config(config())
        .build()
        .unwrap();

    let error = client.execute(ApiRequest::get("/canvas")).await.unwrap_err();
    assert_eq!(error.code(), ErrorCode::Unauthorized);
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_replay_gets_fresh_retry_budget() {
    // 503, 401 (refresh), then 503 twice more before success: five dispatches in total.
    let transport = MockTransport::new(|request, n| {
        let fresh = request
            .headers
            .get("authorization")
            .map(|v| v == "Bearer t2")
            .unwrap_or(false);
        match (n, fresh) {
            (0, _) => Ok(response(503, "down")),
            (1, _) => Ok(response(401, "token expired")),
            (2, true) | (3, true) => Ok(response(503, "down")),
            (_, true) => Ok(response(200, "")),
            (_, false) => Ok(response(401, "token expired")),
        }
    });
    let refreshes = Arc::new(AtomicU32::new(0));
    let client = ApiClient::builder(transport.clone())
        .config(config())
        .token_refresher(slow_refresher(refreshes.clone(), Ok(Some("t2".into()))))
        .build()
        .unwrap();

    let response = client.execute(ApiRequest::get("/canvas")).await.unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.attempts, 5);
    let attempts: Vec<u32> = transport.calls().iter().map(|c| c.attempt).collect();
    assert_eq!(attempts, vec![1, 2, 1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn test_custom_expiry_matcher() {
    use resilient_api_client::errors::ExpiryMatcher;

    let transport = MockTransport::sequence(vec![Ok(response(401, r#"{"code":"jwt_stale"}"#))]);
    let client = ApiClient::builder(transport.clone())
        .config(config())
        .expiry_matcher(ExpiryMatcher::custom(|raw| {
            raw.body()
                .and_then(|b| b.get("code"))
                .and_then(|c| c.as_str())
                == Some("jwt_stale")
        }))
        .build()
        .unwrap();

    let error = client.execute(ApiRequest::get("/canvas")).await.unwrap_err();
    assert_eq!(error.code(), ErrorCode::TokenExpired);
}
