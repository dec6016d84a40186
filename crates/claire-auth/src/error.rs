//! Error type for token verification and authentication.

/// Errors produced while verifying or issuing tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Signature, claim, or structural verification failed.
    #[error("token verification failed: {0}")]
    Invalid(String),

    /// The token's `exp` claim is in the past.
    #[error("token expired")]
    Expired,

    /// The provider could not reach or parse its key source (JWKS endpoint, etc).
    #[error("key source unavailable: {0}")]
    KeySourceUnavailable(String),

    /// No key with the token's `kid` was found in the provider's key set.
    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    /// `authenticate`/`refresh` called against a provider that does not support it.
    #[error("operation not supported by this provider")]
    NotSupported,

    /// Username/password or refresh token did not resolve to a session.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Catch-all for unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for claire_core::ClaireError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Invalid(msg) | AuthError::KeySourceUnavailable(msg) => {
                Self::AuthInvalid(msg)
            }
            AuthError::UnknownKey(kid) => Self::AuthInvalid(format!("unknown signing key: {kid}")),
            AuthError::Expired => Self::AuthExpired,
            AuthError::NotSupported => {
                Self::AuthInvalid("operation not supported by this provider".to_owned())
            }
            AuthError::InvalidCredentials => Self::AuthInvalid("invalid credentials".to_owned()),
            AuthError::Internal(e) => Self::Internal(e),
        }
    }
}
