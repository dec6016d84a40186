//! `POST /api/v1/eln`, `GET /api/v1/eln`, `GET /api/v1/eln/{id}` — submission
//! finalization and retrieval.
//!
//! List/get apply [`claire_rbac::filter_viewable`]/[`claire_rbac::can_view`]
//! after the store returns results; the store itself has no notion of
//! scope, matching the §4.4 split between storage and enforcement.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use claire_core::{ClaireError, Principal};
use claire_submissions::FinalizeRequest;
use http::{Response, Uri};
use serde::Deserialize;

use crate::body::ClaireBody;
use crate::envelope;
use crate::error::HttpError;
use crate::query::query_param;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateSubmissionRequest {
    sop_id: String,
    sop_version: String,
    #[serde(default)]
    body: serde_json::Value,
    #[serde(default)]
    attachments: Vec<String>,
    draft_id: Option<String>,
    idempotency_key: Option<String>,
}

/// `POST /api/v1/eln`.
///
/// # Errors
/// Returns whatever [`claire_submissions::SubmissionStore::finalize`]
/// returns: `PermissionDenied`, `NotFound`, `ValidationFailed`, or
/// `KeyCollision` on retry exhaustion.
pub async fn create(
    state: &AppState,
    principal: &Principal,
    body: &Bytes,
) -> Result<Response<ClaireBody>, ClaireError> {
    let request: CreateSubmissionRequest =
        serde_json::from_slice(body).map_err(|e| HttpError::MalformedBody(e.to_string()))?;

    let submission = state
        .submissions
        .finalize(
            principal,
            FinalizeRequest {
                sop_id: request.sop_id,
                sop_version: request.sop_version,
                body: request.body,
                attachment_file_ids: request.attachments,
                draft_id: request.draft_id,
                idempotency_key: request.idempotency_key,
            },
        )
        .await
        .map_err(ClaireError::from)?;

    Ok(envelope::ok(&serde_json::json!({
        "submission_id": submission.submission_id,
        "object_key": submission.object_key,
        "submitted_at": submission.submitted_at,
    })))
}

/// `GET /api/v1/eln/{id}`.
///
/// # Errors
/// Returns [`ClaireError::NotFound`] if no such submission exists, or
/// [`ClaireError::PermissionDenied`] if the caller's scope does not cover it.
pub async fn get(
    state: &AppState,
    principal: &Principal,
    submission_id: &str,
) -> Result<Response<ClaireBody>, ClaireError> {
    let submission = state
        .submissions
        .get(submission_id)
        .await
        .map_err(ClaireError::from)?;
    if !claire_rbac::can_view(principal, &submission) {
        return Err(ClaireError::PermissionDenied("view".to_owned()));
    }
    Ok(envelope::ok(&submission))
}

/// `GET /api/v1/eln` — RBAC-filtered, paged listing.
///
/// # Errors
/// Returns [`ClaireError::Internal`] if the backend listing fails.
pub async fn list(
    state: &AppState,
    principal: &Principal,
    uri: &Uri,
) -> Result<Response<ClaireBody>, ClaireError> {
    let sop_id = query_param(uri, "sop_id");
    let submitter = query_param(uri, "submitter");
    let since: Option<DateTime<Utc>> = query_param(uri, "since")
        .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let cursor = query_param(uri, "cursor");
    let limit: usize = query_param(uri, "limit")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    let (submissions, next_cursor) = state
        .submissions
        .list(sop_id.as_deref(), submitter.as_deref(), since, cursor.as_deref(), limit)
        .await
        .map_err(ClaireError::from)?;

    let visible = claire_rbac::filter_viewable(principal, submissions);
    Ok(envelope::ok(&serde_json::json!({
        "items": visible,
        "next_cursor": next_cursor,
    })))
}
