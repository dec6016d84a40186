//! Error type for submission finalization.

use claire_core::ValidationIssue;

/// Errors produced while finalizing or retrieving a submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionsError {
    /// The principal lacks `submit:<sop_id>` (or `submit:deprecated` for a
    /// deprecated SOP version).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No submission, SOP, or attachment exists for the given identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The body failed SOP field or cross-field validation.
    #[error("validation failed")]
    ValidationFailed(Vec<ValidationIssue>),

    /// A filename-component field required for key composition was absent.
    #[error("key composition failed: {0}")]
    KeyComposition(String),

    /// The computed object key collided after exhausting the retry budget.
    #[error("key collision could not be resolved: {0}")]
    KeyCollision(String),

    /// Catch-all for unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SubmissionsError> for claire_core::ClaireError {
    fn from(err: SubmissionsError) -> Self {
        match err {
            SubmissionsError::PermissionDenied(msg) => Self::PermissionDenied(msg),
            SubmissionsError::NotFound(id) => Self::NotFound(id),
            SubmissionsError::ValidationFailed(issues) => Self::ValidationFailed(issues),
            SubmissionsError::KeyComposition(msg) => Self::ValidationFailed(vec![
                ValidationIssue::new("", "ATTACHMENT_MISSING", msg),
            ]),
            SubmissionsError::KeyCollision(msg) => Self::KeyCollision(msg),
            SubmissionsError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<claire_sop::SopError> for SubmissionsError {
    fn from(err: claire_sop::SopError) -> Self {
        match err {
            claire_sop::SopError::NotFound(id) => Self::NotFound(id),
            claire_sop::SopError::Malformed(msg) => Self::Internal(anyhow::anyhow!(msg)),
            claire_sop::SopError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<claire_files::FilesError> for SubmissionsError {
    fn from(err: claire_files::FilesError) -> Self {
        match err {
            claire_files::FilesError::NotFound(id) => Self::NotFound(id),
            other => Self::Internal(anyhow::anyhow!(other)),
        }
    }
}

impl From<claire_storage::StorageError> for SubmissionsError {
    fn from(err: claire_storage::StorageError) -> Self {
        match err {
            claire_storage::StorageError::NotFound(bucket, key) => {
                Self::NotFound(format!("{bucket}/{key}"))
            }
            other => Self::Internal(anyhow::anyhow!(other)),
        }
    }
}
