//! Error type for storage backend operations.

/// Errors produced by a [`crate::StorageBackend`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No object exists at the given bucket/key.
    #[error("object not found: {0}/{1}")]
    NotFound(String, String),

    /// A presigned URL's signature or expiry check failed.
    #[error("presigned URL invalid: {0}")]
    PresignInvalid(String),

    /// The backend could not be reached within the retry budget.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Catch-all for unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StorageError> for claire_core::ClaireError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(bucket, key) => Self::NotFound(format!("{bucket}/{key}")),
            StorageError::PresignInvalid(msg) => Self::AuthInvalid(msg),
            StorageError::Unavailable(msg) => Self::StorageUnavailable(msg),
            StorageError::Internal(e) => Self::Internal(e),
        }
    }
}
