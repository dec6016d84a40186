//! Username/password resolution for the self-hosted provider's
//! `authenticate`/`refresh` flow.
//!
//! Cognito's equivalent is a client-side hosted-UI flow, out of this crate's
//! scope; only [`JwtProvider`](crate::jwt::JwtProvider) consults a
//! [`CredentialStore`].

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// A resolved user record backing a password-grant login.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Stable subject identifier.
    pub subject: String,
    /// Display username.
    pub username: String,
    /// Email address, if any.
    pub email: Option<String>,
    /// Group memberships, used to derive permissions.
    pub groups: Vec<String>,
}

/// Resolves credentials to a [`UserRecord`].
///
/// Implementations may back this with a database, an identity directory, or
/// (for development/testing) a static in-memory table.
pub trait CredentialStore: Send + Sync {
    /// Verify a username/password pair, returning the matching user record.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] if the pair does not match.
    fn verify_password(&self, username: &str, password: &str) -> Result<UserRecord, AuthError>;

    /// Resolve a previously-issued refresh token back to its user record.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] if the token is unknown.
    fn resolve_refresh_token(&self, refresh_token: &str) -> Result<UserRecord, AuthError>;
}

fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// An in-memory [`CredentialStore`] keyed by username, storing password
/// hashes rather than plaintext.
///
/// Suitable for development and test environments. Production deployments
/// should implement [`CredentialStore`] against a real identity store.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    users: DashMap<String, (String, UserRecord)>,
    refresh_tokens: DashMap<String, String>,
}

impl StaticCredentialStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with a plaintext password (hashed before storage).
    pub fn add_user(&self, password: &str, user: UserRecord) {
        self.users
            .insert(user.username.clone(), (hash_password(password), user));
    }

    /// Associate a refresh token with a username, so it can later be resolved.
    pub fn issue_refresh_token(&self, refresh_token: impl Into<String>, username: impl Into<String>) {
        self.refresh_tokens
            .insert(refresh_token.into(), username.into());
    }
}

impl CredentialStore for StaticCredentialStore {
    fn verify_password(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let entry = self
            .users
            .get(username)
            .ok_or(AuthError::InvalidCredentials)?;
        let (hash, user) = entry.value();
        if hash.as_str() == hash_password(password) {
            Ok(user.clone())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    fn resolve_refresh_token(&self, refresh_token: &str) -> Result<UserRecord, AuthError> {
        let username = self
            .refresh_tokens
            .get(refresh_token)
            .ok_or(AuthError::InvalidCredentials)?
            .clone();
        let entry = self
            .users
            .get(&username)
            .ok_or(AuthError::InvalidCredentials)?;
        Ok(entry.value().1.clone())
    }
}
