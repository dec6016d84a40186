//! The `Submission` model: the immutable artifact materialized at
//! finalization time, and the narrower views other crates need of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of one attachment's integrity data as recorded at finalize
/// time, embedded in the submission artifact so the binding survives even
/// if the underlying file record is later administratively removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentSnapshot {
    /// The file id referenced from the submission body.
    pub file_id: String,
    /// The authoritative hash recorded by the File Service at upload time.
    pub sha256: String,
    /// Media type as recorded by the File Service.
    pub media_type: String,
    /// Size in bytes as recorded by the File Service.
    pub size_bytes: u64,
}

/// A snapshot of the submitting principal, embedded for provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrincipalSnapshot {
    /// Stable subject identifier.
    pub subject: String,
    /// Display username (also embedded in the object key).
    pub username: String,
    /// Group memberships at submission time, used to evaluate `view:group`
    /// against this submission without a live lookup.
    pub groups: Vec<String>,
}

/// An immutable, finalized submission (§3 "Submission (ELN)").
///
/// Once materialized, every field is fixed; there is no server-side
/// mutation path for a published submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// The SOP this submission was validated against.
    pub sop_id: String,
    /// The exact SOP version pinned at submission time.
    pub sop_version: String,
    /// Opaque identifier; equal to `object_key` since the key is already
    /// guaranteed unique and content-derived.
    pub submission_id: String,
    /// Snapshot of the principal that submitted this record.
    pub principal: PrincipalSnapshot,
    /// When this submission was finalized.
    pub submitted_at: DateTime<Utc>,
    /// The canonical, SOP-validated field assignment.
    pub body: serde_json::Value,
    /// Attachment integrity snapshots, in the order referenced from `body`.
    pub attachments: Vec<AttachmentSnapshot>,
    /// The deterministically derived, backend-relative object key.
    pub object_key: String,
    /// `sha256` of the artifact's own canonical bytes (every field above,
    /// self-descriptive once embedded).
    pub checksum: String,
}

impl claire_rbac::SubmissionView for Submission {
    fn submitter(&self) -> &str {
        &self.principal.username
    }

    fn submitter_subject(&self) -> &str {
        &self.principal.subject
    }

    fn submitter_groups(&self) -> &[String] {
        &self.principal.groups
    }
}

/// The idempotency record written alongside a finalized submission, letting
/// a retried request with the same `idempotency_key` converge to the
/// original result instead of writing a duplicate artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    /// The object key of the submission this idempotency key resolved to.
    pub object_key: String,
    /// The submission id (identical to `object_key`).
    pub submission_id: String,
    /// When the original submission was finalized.
    pub submitted_at: DateTime<Utc>,
}
