//! Endpoint matching logic.
//!
//! # Responsibilities
//! - Match the request method (exact, case-insensitive, or `*`)
//! - Match the request path (exact, or prefix for patterns ending in `*`)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Method matching is case-insensitive
//! - Path matching is case-sensitive
//! - Absolute URLs are reduced to their path; query and fragment are ignored
//! - No regex, patterns are compiled once into prefix/exact matchers

use std::borrow::Cow;

use reqwest::Method;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the method/path pair matches this condition.
    fn matches(&self, method: &Method, path: &str) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub enum MethodMatcher {
    Any,
    Exact(Method),
    /// Compiled from an invalid pattern.
    Never,
}

impl MethodMatcher {
    /// Compile a method pattern. `*` matches everything.
    pub fn new(pattern: &str) -> Self {
        if pattern.trim() == "*" {
            return MethodMatcher::Any;
        }
        match Method::from_bytes(pattern.trim().to_ascii_uppercase().as_bytes()) {
            Ok(method) => MethodMatcher::Exact(method),
            Err(_) => {
                tracing::warn!(pattern = %pattern, "Invalid method pattern, rule will match nothing");
                MethodMatcher::Never
            }
        }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, method: &Method, _path: &str) -> bool {
        match self {
            MethodMatcher::Any => true,
            MethodMatcher::Exact(expected) => expected == method,
            MethodMatcher::Never => false,
        }
    }
}

/// Matches the request path.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    Exact(String),
    Prefix(String),
}

impl PathMatcher {
    /// Compile a path pattern. A trailing `*` turns it into a prefix match.
    pub fn new(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => PathMatcher::Prefix(prefix.to_string()),
            None => PathMatcher::Exact(pattern.to_string()),
        }
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, _method: &Method, path: &str) -> bool {
        match self {
            PathMatcher::Exact(expected) => path == expected,
            PathMatcher::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, method: &Method, path: &str) -> bool {
        self.matchers.iter().all(|m| m.matches(method, path))
    }
}

/// Reduce a request URL to the path used for rule matching.
///
/// `https://api.example.com/admin/users?page=2` → `/admin/users`;
/// relative URLs only lose their query and fragment.
pub fn request_path(url: &str) -> Cow<'_, str> {
    if let Ok(parsed) = url::Url::parse(url) {
        if parsed.has_host() {
            return Cow::Owned(parsed.path().to_string());
        }
    }
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    Cow::Borrowed(&url[..end])
}
