//! Error type for draft operations.

/// Errors produced by the draft store.
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// No draft exists for the given owner/draft id (or it expired).
    #[error("draft not found: {0}")]
    NotFound(String),

    /// Catch-all for unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DraftError> for claire_core::ClaireError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::NotFound(id) => Self::NotFound(id),
            DraftError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<claire_storage::StorageError> for DraftError {
    fn from(err: claire_storage::StorageError) -> Self {
        match err {
            claire_storage::StorageError::NotFound(bucket, key) => {
                Self::NotFound(format!("{bucket}/{key}"))
            }
            other => Self::Internal(anyhow::anyhow!(other)),
        }
    }
}
