//! Redaction of credentials before anything reaches a logger.

use reqwest::header::HeaderMap;
use serde_json::Value;
use url::Url;

/// Replacement text for redacted values.
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-csrf-token",
];

const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "apikey",
    "api_key",
    "authorization",
    "credit_card",
    "card_number",
    "cvv",
    "ssn",
];

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|s| key.contains(s))
}

/// Header pairs with credential-bearing values replaced.
pub fn sanitize_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name = name.as_str().to_string();
            let value = if SENSITIVE_HEADERS.contains(&name.as_str()) {
                REDACTED.to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name, value)
        })
        .collect()
}

/// Copy of a JSON body with sensitive keys redacted at any depth.
pub fn sanitize_body(body: &Value) -> Value {
    match body {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if is_sensitive_key(k) {
                        Value::String(REDACTED.to_string())
                    } else {
                        sanitize_body(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(sanitize_body).collect()),
        other => other.clone(),
    }
}

/// URL with userinfo stripped and sensitive query parameter values redacted.
pub fn sanitize_url(url: &str) -> String {
    let url = strip_userinfo(url);
    let Some((base, query)) = url.split_once('?') else {
        return url;
    };
    let (query, fragment) = match query.split_once('#') {
        Some((q, f)) => (q, Some(f)),
        None => (query, None),
    };

    let query = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{}={}", key, REDACTED),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    match fragment {
        Some(f) => format!("{}?{}#{}", base, query, f),
        None => format!("{}?{}", base, query),
    }
}

/// Absolute URLs lose `user:password@`; anything else passes through.
fn strip_userinfo(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            // Both setters only fail for cannot-be-a-base URLs, which carry no userinfo.
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Free text (error messages, transport diagnostics) with every URL in it sanitized.
pub fn sanitize_text(text: &str) -> String {
    text.split_inclusive(char::is_whitespace)
        .map(|piece| {
            let token = piece.trim_end_matches(char::is_whitespace);
            let trailing = &piece[token.len()..];
            let inner = token.trim_start_matches(|c: char| matches!(c, '(' | '<' | '"' | '\''));
            let core = inner.trim_end_matches(|c: char| {
                matches!(c, ')' | '>' | '"' | '\'' | ',' | ';' | ':' | '.')
            });
            if core.is_empty() || !(core.contains("://") || core.contains('?')) {
                return piece.to_string();
            }
            let start = token.len() - inner.len();
            let end = start + core.len();
            format!("{}{}{}{}", &token[..start], sanitize_url(core), &token[end..], trailing)
        })
        .collect()
}

/// Query parameters with sensitive values redacted.
pub fn sanitize_params(params: &[(String, String)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| {
            if is_sensitive_key(k) {
                (k.clone(), REDACTED.to_string())
            } else {
                (k.clone(), v.clone())
            }
        })
        .collect()
}
