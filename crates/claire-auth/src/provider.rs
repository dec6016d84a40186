//! The `AuthProvider` trait implemented by both backends.

use async_trait::async_trait;
use claire_core::Principal;

use crate::error::AuthError;

/// A verified token pair plus the principal it resolves to, returned by
/// `authenticate` and `refresh`.
#[derive(Debug, Clone)]
pub struct Session {
    /// Short-lived access token.
    pub token: String,
    /// Longer-lived token used to mint a new [`Session`] without
    /// re-presenting credentials.
    pub refresh_token: String,
    /// The principal the access token resolves to.
    pub principal: Principal,
}

/// Verifies bearer tokens and, where supported, issues them.
///
/// `CognitoProvider` and `JwtProvider` both implement this; the HTTP surface
/// depends only on the trait, never on a concrete provider.
#[async_trait]
pub trait AuthProvider: std::fmt::Debug + Send + Sync {
    /// Verify a bearer token and resolve it to a principal.
    ///
    /// # Errors
    /// Returns [`AuthError::Invalid`] or [`AuthError::Expired`] on a
    /// malformed, unsigned, or expired token.
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;

    /// Exchange a username/password pair for a new session.
    ///
    /// # Errors
    /// Returns [`AuthError::NotSupported`] for providers that delegate login
    /// to a hosted flow, or [`AuthError::InvalidCredentials`] on mismatch.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Session, AuthError>;

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    /// Returns [`AuthError::NotSupported`] for providers that delegate login
    /// to a hosted flow, or [`AuthError::InvalidCredentials`] if the refresh
    /// token is unknown or revoked.
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;
}
