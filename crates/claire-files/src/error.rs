//! Error type for file upload/integrity operations.

/// Errors produced by the file service.
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// No file record exists for the given id.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The uploaded or declared size exceeds the configured ceiling.
    #[error("file too large")]
    TooLarge,

    /// Declared `Content-Type` does not match the allowlist or the sniffed
    /// byte signature.
    #[error("media type rejected: {0}")]
    MediaTypeRejected(String),

    /// The authoritative `sha256` computed on finalize differs from a
    /// client-asserted hash.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A presigned upload was finalized before the object existed, or with
    /// zero bytes.
    #[error("upload incomplete")]
    UploadIncomplete,

    /// Catch-all for unexpected internal errors.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FilesError> for claire_core::ClaireError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::NotFound(id) => Self::NotFound(id),
            FilesError::TooLarge => Self::FileTooLarge,
            FilesError::MediaTypeRejected(mt) => Self::MediaTypeRejected(mt),
            FilesError::ChecksumMismatch => Self::ChecksumMismatch,
            FilesError::UploadIncomplete => Self::UploadIncomplete,
            FilesError::Internal(e) => Self::Internal(e),
        }
    }
}

impl From<claire_storage::StorageError> for FilesError {
    fn from(err: claire_storage::StorageError) -> Self {
        match err {
            claire_storage::StorageError::NotFound(bucket, key) => {
                Self::NotFound(format!("{bucket}/{key}"))
            }
            other => Self::Internal(anyhow::anyhow!(other)),
        }
    }
}
