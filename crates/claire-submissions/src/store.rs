//! `SubmissionStore`: the finalization pipeline (§4.8), the hardest
//! subsystem in the core — admit, resolve, validate, compose key,
//! materialize, bind attachments, retire the draft.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use claire_core::Principal;
use claire_drafts::DraftStore;
use claire_files::FileStore;
use claire_sop::{AttachmentInfo, SopRegistry, SopStatus};
use claire_storage::{Bucket, StorageBackend};
use rand::Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::SubmissionsError;
use crate::keygen::compose_object_key;
use crate::model::{AttachmentSnapshot, IdempotencyRecord, PrincipalSnapshot, Submission};

/// Bounded retry budget for a colliding object key (§4.8 step 4, §7 `KeyCollision`).
const MAX_KEY_RETRIES: u8 = 5;

/// The inbound shape of a finalize request, as carried by `POST /api/v1/eln`.
#[derive(Debug, Clone)]
pub struct FinalizeRequest {
    /// The SOP this submission is filled out against.
    pub sop_id: String,
    /// The exact SOP version the client validated the form against.
    pub sop_version: String,
    /// The submitted field assignment.
    pub body: serde_json::Value,
    /// File ids the client declares as attachments to this submission.
    pub attachment_file_ids: Vec<String>,
    /// The draft this request was filled out from, if any; retired on success.
    pub draft_id: Option<String>,
    /// Client-supplied token letting a retried request converge to the
    /// original result instead of writing a duplicate artifact.
    pub idempotency_key: Option<String>,
}

fn random_nonce() -> String {
    let mut rng = rand::rng();
    let mut buf = [0u8; 2];
    rng.fill(&mut buf);
    hex::encode(buf)
}

fn idempotency_key_path(key: &str) -> String {
    format!("idempotency/{key}.json")
}

fn is_submission_key(key: &str) -> bool {
    !key.starts_with("files/") && !key.starts_with("file-records/") && !key.starts_with("idempotency/")
}

/// Canonical hash of the artifact, computed over every field except
/// `checksum` itself (the field the hash is then embedded into).
fn artifact_checksum(
    sop_id: &str,
    sop_version: &str,
    object_key: &str,
    principal: &PrincipalSnapshot,
    submitted_at: DateTime<Utc>,
    body: &serde_json::Value,
    attachments: &[AttachmentSnapshot],
) -> String {
    let descriptor = serde_json::json!({
        "sop_id": sop_id,
        "sop_version": sop_version,
        "object_key": object_key,
        "principal": principal,
        "submitted_at": submitted_at,
        "body": body,
        "attachments": attachments,
    });
    let canonical = serde_json::to_vec(&descriptor).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex::encode(hasher.finalize())
}

/// The append-only store behind `POST /api/v1/eln` and its companion reads.
#[derive(Debug)]
pub struct SubmissionStore {
    backend: Arc<dyn StorageBackend>,
    sop_registry: Arc<SopRegistry>,
    file_store: Arc<FileStore>,
    draft_store: Option<Arc<DraftStore>>,
}

impl SubmissionStore {
    /// Construct a submission store wired to its collaborating components.
    #[must_use]
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        sop_registry: Arc<SopRegistry>,
        file_store: Arc<FileStore>,
        draft_store: Option<Arc<DraftStore>>,
    ) -> Self {
        Self {
            backend,
            sop_registry,
            file_store,
            draft_store,
        }
    }

    async fn idempotent_replay(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<Submission>, SubmissionsError> {
        let path = idempotency_key_path(idempotency_key);
        match self.backend.get(Bucket::Eln, &path).await {
            Ok(object) => {
                let record: IdempotencyRecord = serde_json::from_slice(&object.bytes)
                    .map_err(|e| SubmissionsError::Internal(anyhow::anyhow!(e)))?;
                let submission = self.get(&record.submission_id).await?;
                Ok(Some(submission))
            }
            Err(claire_storage::StorageError::NotFound(_, _)) => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    /// Resolve every declared attachment id to its File Service record.
    ///
    /// Per §4.8 step 3, "all attachments named in the body must resolve to
    /// existing File handles owned or previously produced by the
    /// submitter" — an id that does not resolve, or that resolves to a
    /// file owned by someone else, is a validation failure for the whole
    /// request, not a silently dropped attachment. Collected alongside the
    /// SOP field-validation issues so a caller sees every problem with the
    /// request in one response.
    async fn resolve_attachments(
        &self,
        principal: &Principal,
        file_ids: &[String],
    ) -> (HashMap<String, AttachmentInfo>, Vec<claire_core::ValidationIssue>) {
        let mut map = HashMap::with_capacity(file_ids.len());
        let mut issues = Vec::new();
        for file_id in file_ids {
            match self.file_store.get_record(file_id).await {
                Ok(record) if record.owner == principal.subject => {
                    map.insert(
                        file_id.clone(),
                        AttachmentInfo {
                            media_type: record.media_type,
                            size_bytes: record.size_bytes,
                        },
                    );
                }
                Ok(_) | Err(_) => {
                    issues.push(claire_core::ValidationIssue::new(
                        file_id.as_str(),
                        "ATTACHMENT_MISSING",
                        format!(
                            "attachment {file_id} does not resolve to a file owned by the submitter"
                        ),
                    ));
                }
            }
        }
        (map, issues)
    }

    /// Run the full finalization pipeline (§4.8 steps 1-7).
    ///
    /// # Errors
    /// Returns [`SubmissionsError::PermissionDenied`] if admission fails,
    /// [`SubmissionsError::NotFound`] if the SOP or idempotency replay
    /// target does not resolve, [`SubmissionsError::ValidationFailed`] if
    /// the body fails field validation, or [`SubmissionsError::KeyCollision`]
    /// if the object key could not be made unique within the retry budget.
    pub async fn finalize(
        &self,
        principal: &Principal,
        request: FinalizeRequest,
    ) -> Result<Submission, SubmissionsError> {
        if let Some(idempotency_key) = &request.idempotency_key {
            if let Some(existing) = self.idempotent_replay(idempotency_key).await? {
                debug!(%idempotency_key, "finalize short-circuited by idempotency replay");
                return Ok(existing);
            }
        }

        // 1. Admit.
        if !claire_rbac::can_submit(principal, &request.sop_id) {
            return Err(SubmissionsError::PermissionDenied(format!(
                "submit:{}",
                request.sop_id
            )));
        }

        // 2. Resolve SOP.
        let sop = self
            .sop_registry
            .get(&request.sop_id, Some(&request.sop_version))
            .await?;
        match sop.metadata.status {
            SopStatus::Draft => {
                return Err(SubmissionsError::NotFound(format!(
                    "{}@{} is not yet published",
                    request.sop_id, request.sop_version
                )));
            }
            SopStatus::Deprecated => {
                if !claire_rbac::can_submit_deprecated(principal, &request.sop_id) {
                    return Err(SubmissionsError::PermissionDenied("submit:deprecated".to_owned()));
                }
            }
            SopStatus::Published => {}
        }

        // 3. Validate.
        let (attachments_by_id, mut issues) = self
            .resolve_attachments(principal, &request.attachment_file_ids)
            .await;
        issues.extend(claire_sop::validate(&sop, &request.body, &attachments_by_id));
        if !issues.is_empty() {
            return Err(SubmissionsError::ValidationFailed(issues));
        }

        // 4. Compose key, with a bounded retry budget on collision.
        let submitted_at = Utc::now();
        let mut object_key = String::new();
        let mut collided = true;
        for _ in 0..MAX_KEY_RETRIES {
            let nonce = random_nonce();
            let candidate =
                compose_object_key(&sop, &principal.username, &request.body, submitted_at, &nonce)?;
            match self.backend.head(Bucket::Eln, &candidate).await {
                Err(claire_storage::StorageError::NotFound(_, _)) => {
                    object_key = candidate;
                    collided = false;
                    break;
                }
                Ok(_) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        if collided {
            return Err(SubmissionsError::KeyCollision(format!(
                "exhausted {MAX_KEY_RETRIES} retries composing a unique object key"
            )));
        }

        // 5. Materialize.
        let principal_snapshot = PrincipalSnapshot {
            subject: principal.subject.clone(),
            username: principal.username.clone(),
            groups: principal.groups.clone(),
        };
        let mut attachment_snapshots: Vec<AttachmentSnapshot> = request
            .attachment_file_ids
            .iter()
            .filter_map(|id| {
                attachments_by_id.get(id).map(|info| AttachmentSnapshot {
                    file_id: id.clone(),
                    sha256: String::new(),
                    media_type: info.media_type.clone(),
                    size_bytes: info.size_bytes,
                })
            })
            .collect();
        // Embed the authoritative hash the File Service recorded at upload
        // time rather than trusting a client-asserted value here.
        for snapshot in &mut attachment_snapshots {
            if let Ok(record) = self.file_store.get_record(&snapshot.file_id).await {
                snapshot.sha256 = record.sha256;
            }
        }

        let checksum = artifact_checksum(
            &request.sop_id,
            &request.sop_version,
            &object_key,
            &principal_snapshot,
            submitted_at,
            &request.body,
            &attachment_snapshots,
        );

        let submission = Submission {
            sop_id: request.sop_id.clone(),
            sop_version: request.sop_version.clone(),
            submission_id: object_key.clone(),
            principal: principal_snapshot,
            submitted_at,
            body: request.body.clone(),
            attachments: attachment_snapshots,
            object_key: object_key.clone(),
            checksum,
        };

        let bytes = serde_json::to_vec(&submission)
            .map_err(|e| SubmissionsError::Internal(anyhow::anyhow!(e)))?;
        self.backend
            .put(Bucket::Eln, &object_key, Bytes::from(bytes), "application/json")
            .await?;

        // 6. Finalize attachments.
        for file_id in &request.attachment_file_ids {
            if attachments_by_id.contains_key(file_id) {
                if let Err(e) = self.file_store.mark_bound(file_id).await {
                    warn!(%file_id, error = %e, "failed to mark attachment bound after finalize");
                }
            }
        }

        // 7. Retire draft.
        if let (Some(draft_id), Some(draft_store)) = (&request.draft_id, &self.draft_store) {
            if let Err(e) = draft_store.delete(&principal.subject, draft_id).await {
                warn!(%draft_id, error = %e, "failed to retire draft after finalize");
            }
        }

        if let Some(idempotency_key) = &request.idempotency_key {
            let record = IdempotencyRecord {
                object_key: object_key.clone(),
                submission_id: object_key.clone(),
                submitted_at,
            };
            if let Ok(bytes) = serde_json::to_vec(&record) {
                if let Err(e) = self
                    .backend
                    .put(
                        Bucket::Eln,
                        &idempotency_key_path(idempotency_key),
                        Bytes::from(bytes),
                        "application/json",
                    )
                    .await
                {
                    warn!(%idempotency_key, error = %e, "failed to persist idempotency record");
                }
            }
        }

        debug!(%object_key, sop_id = %request.sop_id, "submission finalized");
        Ok(submission)
    }

    /// Fetch a single submission by its id (equal to its `object_key`).
    ///
    /// # Errors
    /// Returns [`SubmissionsError::NotFound`] if no submission exists at that key.
    pub async fn get(&self, submission_id: &str) -> Result<Submission, SubmissionsError> {
        let object = self.backend.get(Bucket::Eln, submission_id).await?;
        let submission: Submission = serde_json::from_slice(&object.bytes)
            .map_err(|e| SubmissionsError::Internal(anyhow::anyhow!(e)))?;
        Ok(submission)
    }

    /// List submissions, optionally narrowed to one SOP, one submitter, or a
    /// lower bound on `submitted_at`. RBAC filtering is the caller's
    /// responsibility (`claire-rbac::filter_viewable`), kept out of this
    /// store so the enforcer stays the single place scope predicates live.
    ///
    /// # Errors
    /// Returns [`SubmissionsError::Internal`] if the backend listing fails.
    pub async fn list(
        &self,
        sop_id: Option<&str>,
        submitter: Option<&str>,
        since: Option<DateTime<Utc>>,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<(Vec<Submission>, Option<String>), SubmissionsError> {
        let prefix = sop_id.map(|s| format!("{s}/")).unwrap_or_default();
        let page = self
            .backend
            .list(Bucket::Eln, &prefix, cursor, limit)
            .await
            .map_err(|e| SubmissionsError::Internal(anyhow::anyhow!(e)))?;

        let mut submissions = Vec::new();
        for entry in &page.entries {
            if !is_submission_key(&entry.key) {
                continue;
            }
            let Ok(submission) = self.get(&entry.key).await else {
                continue;
            };
            if submitter.is_some_and(|s| s != submission.principal.username) {
                continue;
            }
            if since.is_some_and(|since| submission.submitted_at < since) {
                continue;
            }
            submissions.push(submission);
        }
        Ok((submissions, page.next_cursor))
    }
}
