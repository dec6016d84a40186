//! The `File` record and pending-upload reservation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored, content-verified binary attachment.
///
/// Bytes are never rewritten once a record exists: a re-upload of changed
/// content produces a new `file_id`, never mutates an existing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Content- and nonce-derived identifier, stable for the life of the file.
    pub file_id: String,
    /// Client-supplied filename, not used for any storage decision.
    pub original_name: String,
    /// Media type, verified against both declaration and byte signature.
    pub media_type: String,
    /// Exact byte length of the stored object.
    pub size_bytes: u64,
    /// Authoritative integrity hash, computed server-side on finalize.
    pub sha256: String,
    /// The principal id that produced this file.
    pub owner: String,
    /// When this record was finalized.
    pub created_at: DateTime<Utc>,
    /// The backend key holding the raw bytes.
    pub storage_key: String,
    /// Set once a submission binds this file as an attachment; bound files
    /// are no longer eligible for the orphan sweep.
    pub bound: bool,
}
