//! Types shared by every [`crate::StorageBackend`] implementation.

use chrono::{DateTime, Utc};

/// The four logical buckets a deployment provisions, named to match
/// [`claire_core::BucketsConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// SOP documents.
    Forms,
    /// Draft autosave state.
    Drafts,
    /// Finalized submissions.
    Eln,
    /// Lambda-adjacent scratch space.
    Lambda,
}

impl Bucket {
    /// The path segment this bucket maps to within the namespaced key space.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forms => "forms",
            Self::Drafts => "drafts",
            Self::Eln => "eln",
            Self::Lambda => "lambda",
        }
    }
}

/// Metadata about a stored object, returned by `head`.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    /// Size in bytes.
    pub size: u64,
    /// Content/media type as stored.
    pub media_type: String,
    /// Last-modified timestamp.
    pub last_modified: DateTime<Utc>,
}

/// One entry returned by `list`.
#[derive(Debug, Clone)]
pub struct ListEntry {
    /// The full key, relative to the bucket namespace.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last-modified timestamp.
    pub last_modified: DateTime<Utc>,
}

/// A page of `list` results.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Entries in this page, in backend-defined order.
    pub entries: Vec<ListEntry>,
    /// Opaque cursor for the next page, if more results remain.
    pub next_cursor: Option<String>,
}

/// An object's bytes plus its stored media type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// The raw, untranscoded bytes as originally written.
    pub bytes: bytes::Bytes,
    /// The media type recorded at `put` time.
    pub media_type: String,
}

/// The HTTP method a presigned URL authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMethod {
    /// A presigned upload.
    Put,
    /// A presigned download.
    Get,
}
