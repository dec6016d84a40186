//! Error type for SOP loading and lookup.

/// Errors produced by the SOP registry.
#[derive(Debug, thiserror::Error)]
pub enum SopError {
    /// No document exists for the given `(sop_id, version)`.
    #[error("SOP not found: {0}")]
    NotFound(String),

    /// The YAML document could not be parsed into a `SopDocument`.
    #[error("malformed SOP document: {0}")]
    Malformed(String),

    /// Catch-all for unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SopError> for claire_core::ClaireError {
    fn from(err: SopError) -> Self {
        match err {
            SopError::NotFound(id) => Self::NotFound(id),
            SopError::Malformed(msg) => Self::ConfigInvalid(msg),
            SopError::Internal(e) => Self::Internal(e),
        }
    }
}
