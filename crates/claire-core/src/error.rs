//! Error types shared across CLAIRE components.

/// Top-level CLAIRE error kind, translated to an HTTP envelope by `claire-http`.
///
/// Leaf crates (`claire-auth`, `claire-storage`, `claire-sop`, ...) define their
/// own narrower error enums and convert into this one via `From`, matching the
/// per-crate-error-plus-catch-all pattern used throughout the codebase.
#[derive(Debug, thiserror::Error)]
pub enum ClaireError {
    /// The configuration document is missing required keys or violates a constraint.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// `environment` requires a specific auth provider that was not configured.
    #[error("auth provider does not match environment constraints: {0}")]
    ConfigProviderMismatch(String),

    /// The bearer token failed signature or claim verification.
    #[error("authentication failed: {0}")]
    AuthInvalid(String),

    /// The bearer token is well-formed but expired.
    #[error("authentication token expired")]
    AuthExpired,

    /// The principal lacks the permission required for this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Submission or draft body failed SOP/field validation.
    #[error("validation failed")]
    ValidationFailed(Vec<crate::types::ValidationIssue>),

    /// The request body could not be parsed into the shape the route expects.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// An uploaded file exceeds the configured size limit.
    #[error("file too large")]
    FileTooLarge,

    /// An uploaded file's declared or sniffed media type is not on the allowlist.
    #[error("media type rejected: {0}")]
    MediaTypeRejected(String),

    /// The authoritative checksum did not match a client-asserted value.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A presigned upload was finalized before all bytes arrived.
    #[error("upload incomplete")]
    UploadIncomplete,

    /// The computed object key collided after exhausting retries.
    #[error("key collision could not be resolved: {0}")]
    KeyCollision(String),

    /// The storage backend could not be reached within the allotted retries.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Catch-all for unexpected internal errors, logged with a correlation id.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ClaireError {
    /// The wire error code reported in the envelope's `error.code` field.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigInvalid(_) => "ConfigInvalid",
            Self::ConfigProviderMismatch(_) => "ConfigProviderMismatch",
            Self::AuthInvalid(_) => "AuthInvalid",
            Self::AuthExpired => "AuthExpired",
            Self::PermissionDenied(_) => "PermissionDenied",
            Self::NotFound(_) => "NotFound",
            Self::ValidationFailed(_) => "ValidationFailed",
            Self::MalformedBody(_) => "MalformedBody",
            Self::FileTooLarge => "FileTooLarge",
            Self::MediaTypeRejected(_) => "MediaTypeRejected",
            Self::ChecksumMismatch => "ChecksumMismatch",
            Self::UploadIncomplete => "UploadIncomplete",
            Self::KeyCollision(_) => "KeyCollision",
            Self::StorageUnavailable(_) => "StorageUnavailable",
            Self::Internal(_) => "Internal",
        }
    }

    /// The HTTP status code this error kind maps to, per the §7 error table.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AuthInvalid(_) | Self::AuthExpired => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::ValidationFailed(_) => 400,
            Self::MalformedBody(_) => 422,
            Self::FileTooLarge => 413,
            Self::MediaTypeRejected(_) => 415,
            Self::ChecksumMismatch | Self::UploadIncomplete | Self::KeyCollision(_) => 409,
            Self::StorageUnavailable(_) => 503,
            Self::ConfigInvalid(_) | Self::ConfigProviderMismatch(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}

/// Convenience result type for CLAIRE operations.
pub type ClaireResult<T> = Result<T, ClaireError>;
