//! Credential collaborators supplied by the application.

use std::future::Future;

use async_trait::async_trait;

use crate::errors::ApiError;

/// Why a token refresh did not produce a credential.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    /// The identity provider refused the refresh (revoked session, bad refresh token).
    #[error("refresh rejected: {0}")]
    Rejected(String),

    /// The identity provider could not be reached.
    #[error("refresh unavailable: {0}")]
    Unavailable(String),
}

/// Returns the credential to attach to the next dispatch.
#[async_trait]
pub trait TokenGetter: Send + Sync {
    async fn token(&self) -> Option<String>;
}

#[async_trait]
impl<F> TokenGetter for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    async fn token(&self) -> Option<String> {
        self()
    }
}

/// Obtains a new credential after the current one expired.
///
/// `Ok(None)` is treated as a failed refresh.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<Option<String>, RefreshError>;
}

/// Adapter turning an async closure into a [`TokenRefresher`].
pub struct RefreshFn<F>(F);

/// Wrap `f` as a [`TokenRefresher`].
///
/// ```ignore
/// let refresher = refresh_fn(move || {
///     let session = session.clone();
///     async move { session.renew().await }
/// });
/// ```
pub fn refresh_fn<F, Fut>(f: F) -> RefreshFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, RefreshError>> + Send + 'static,
{
    RefreshFn(f)
}

#[async_trait]
impl<F, Fut> TokenRefresher for RefreshFn<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, RefreshError>> + Send + 'static,
{
    async fn refresh(&self) -> Result<Option<String>, RefreshError> {
        (self.0)().await
    }
}

/// Side effect run when authentication cannot be recovered (e.g. sign the user out).
pub trait AuthFailureHandler: Send + Sync {
    fn on_auth_failure(&self, error: &ApiError);
}

impl<F> AuthFailureHandler for F
where
    F: Fn(&ApiError) + Send + Sync,
{
    fn on_auth_failure(&self, error: &ApiError) {
        self(error)
    }
}
