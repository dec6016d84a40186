//! `/api/v1/drafts` — create, list, update, and delete autosave drafts.
//!
//! Drafts are exclusively owned by their creator (§3); every operation here
//! scopes the [`claire_drafts::DraftStore`] call to the caller's own
//! `principal.subject`, so there is no cross-owner lookup path to guard
//! against in the first place. [`claire_rbac::can_manage_drafts`] still
//! gates update/delete against the `draft:*` permission once the draft is
//! in hand.

use bytes::Bytes;
use claire_core::{ClaireError, Principal};
use claire_rbac::DraftAction;
use http::Response;
use serde::Deserialize;

use crate::body::ClaireBody;
use crate::envelope;
use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateDraftRequest {
    sop_id: String,
    sop_version: String,
    #[serde(default)]
    body: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct UpdateDraftRequest {
    #[serde(default)]
    body: serde_json::Value,
}

fn required_permission(principal: &Principal, action: DraftAction) -> bool {
    principal.is_admin
        || claire_rbac::any_permission_matches(&principal.permissions, &format!("draft:{}", match action {
            DraftAction::Create => "create",
            DraftAction::Update => "update",
            DraftAction::Delete => "delete",
        }))
}

/// `GET /api/v1/drafts` — the caller's own drafts, optionally filtered by
/// `?sop_id=`.
///
/// # Errors
/// Returns [`ClaireError::Internal`] on an unexpected backend failure.
pub async fn list(
    state: &AppState,
    principal: &Principal,
    sop_id: Option<&str>,
) -> Result<Response<ClaireBody>, ClaireError> {
    let drafts = state
        .drafts
        .list(&principal.subject, sop_id)
        .await
        .map_err(ClaireError::from)?;
    Ok(envelope::ok(&drafts))
}

/// `POST /api/v1/drafts`.
///
/// # Errors
/// Returns [`ClaireError::PermissionDenied`] if the caller lacks
/// `draft:create`, or [`ClaireError::MalformedBody`] on a malformed body.
pub async fn create(
    state: &AppState,
    principal: &Principal,
    body: &Bytes,
) -> Result<Response<ClaireBody>, ClaireError> {
    if !required_permission(principal, DraftAction::Create) {
        return Err(ClaireError::PermissionDenied("draft:create".to_owned()));
    }
    let request: CreateDraftRequest = serde_json::from_slice(body)
        .map_err(|e| HttpError::MalformedBody(e.to_string()))?;

    let draft_id = state
        .drafts
        .create(&principal.subject, &request.sop_id, &request.sop_version, request.body)
        .await
        .map_err(ClaireError::from)?;
    let draft = state
        .drafts
        .get(&principal.subject, &draft_id)
        .await
        .map_err(ClaireError::from)?;
    Ok(envelope::ok(&serde_json::json!({
        "draft_id": draft_id,
        "updated_at": draft.updated_at,
    })))
}

/// `PUT /api/v1/drafts/{id}`.
///
/// # Errors
/// Returns [`ClaireError::NotFound`] if no such draft exists,
/// [`ClaireError::PermissionDenied`] if the caller does not own it or lacks
/// `draft:update`.
pub async fn update(
    state: &AppState,
    principal: &Principal,
    draft_id: &str,
    body: &Bytes,
) -> Result<Response<ClaireBody>, ClaireError> {
    let existing = state
        .drafts
        .get(&principal.subject, draft_id)
        .await
        .map_err(ClaireError::from)?;
    if !claire_rbac::can_manage_drafts(principal, DraftAction::Update, &existing) {
        return Err(ClaireError::PermissionDenied("draft:update".to_owned()));
    }
    let request: UpdateDraftRequest = serde_json::from_slice(body)
        .map_err(|e| HttpError::MalformedBody(e.to_string()))?;

    let (updated_at, checksum) = state
        .drafts
        .update(&principal.subject, draft_id, request.body)
        .await
        .map_err(ClaireError::from)?;
    Ok(envelope::ok(&serde_json::json!({
        "updated_at": updated_at,
        "checksum": checksum,
    })))
}

/// `DELETE /api/v1/drafts/{id}`.
///
/// # Errors
/// Returns [`ClaireError::PermissionDenied`] if the caller does not own the
/// draft or lacks `draft:delete`.
pub async fn delete(
    state: &AppState,
    principal: &Principal,
    draft_id: &str,
) -> Result<Response<ClaireBody>, ClaireError> {
    let existing = state
        .drafts
        .get(&principal.subject, draft_id)
        .await
        .map_err(ClaireError::from)?;
    if !claire_rbac::can_manage_drafts(principal, DraftAction::Delete, &existing) {
        return Err(ClaireError::PermissionDenied("draft:delete".to_owned()));
    }
    state
        .drafts
        .delete(&principal.subject, draft_id)
        .await
        .map_err(ClaireError::from)?;
    Ok(envelope::ok(&serde_json::json!({"deleted": true})))
}
