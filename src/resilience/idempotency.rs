//! Which requests may be sent more than once.

use reqwest::Method;

use crate::http::request::RequestMetadata;

/// Whether automatic retries are allowed for this method and metadata.
///
/// Safe methods and PUT/DELETE repeat freely. POST and PATCH need an explicit
/// `retry_override(true)` or an idempotency key. `retry_override(false)` wins
/// over everything.
pub fn is_retry_safe(method: &Method, metadata: &RequestMetadata) -> bool {
    if metadata.retry_override == Some(false) {
        return false;
    }

    match *method {
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE => true,
        Method::PUT | Method::DELETE => true,
        Method::POST | Method::PATCH => {
            metadata.retry_override == Some(true) || metadata.idempotency_key.is_some()
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(retry_override: Option<bool>, key: Option<&str>) -> RequestMetadata {
        RequestMetadata {
            retry_override,
            correlation_id: None,
            idempotency_key: key.map(str::to_string),
        }
    }

    #[test]
    fn test_safe_methods_retry() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE, Method::PUT, Method::DELETE] {
            assert!(is_retry_safe(&method, &meta(None, None)), "{}", method);
        }
    }

    #[test]
    fn test_post_patch_need_marker() {
        for method in [Method::POST, Method::PATCH] {
            assert!(!is_retry_safe(&method, &meta(None, None)));
            assert!(is_retry_safe(&method, &meta(Some(true), None)));
            assert!(is_retry_safe(&method, &meta(None, Some("k-1"))));
        }
    }

    #[test]
    fn test_override_false_disables() {
        assert!(!is_retry_safe(&Method::GET, &meta(Some(false), None)));
        assert!(!is_retry_safe(&Method::POST, &meta(Some(false), Some("k-1"))));
    }

    #[test]
    fn test_unknown_method_not_retried() {
        let method = Method::from_bytes(b"PURGE").unwrap();
        assert!(!is_retry_safe(&method, &meta(None, None)));
        assert!(!is_retry_safe(&Method::CONNECT, &meta(None, None)));
    }
}
