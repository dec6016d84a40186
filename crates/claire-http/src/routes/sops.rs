//! `GET /api/v1/sops` and `GET /api/v1/sops/{sop_id}`.

use claire_core::{ClaireError, Principal};
use http::{Response, Uri};
use serde::Serialize;

use crate::body::ClaireBody;
use crate::envelope;
use crate::query::query_param;
use crate::state::AppState;

/// A slimmed-down view of an SOP document for the list endpoint — the full
/// task/field tree is only returned from the single-document endpoint.
#[derive(Debug, Serialize)]
struct SopSummary {
    sop_id: String,
    version: String,
    title: String,
    status: &'static str,
}

fn status_label(status: claire_sop::SopStatus) -> &'static str {
    match status {
        claire_sop::SopStatus::Draft => "draft",
        claire_sop::SopStatus::Published => "published",
        claire_sop::SopStatus::Deprecated => "deprecated",
    }
}

/// List every SOP the registry can enumerate, as summaries.
///
/// # Errors
/// Returns [`ClaireError::Internal`] if the backend listing fails.
pub async fn list(state: &AppState, _principal: &Principal) -> Result<Response<ClaireBody>, ClaireError> {
    let documents = state.sops.list(None).await?;
    let summaries: Vec<SopSummary> = documents
        .iter()
        .map(|doc| SopSummary {
            sop_id: doc.sop_id.clone(),
            version: doc.version.clone(),
            title: doc.metadata.title.clone(),
            status: status_label(doc.metadata.status),
        })
        .collect();
    Ok(envelope::ok(&summaries))
}

/// Fetch a single SOP document, pinned to `?version=` if given, else the
/// latest published version.
///
/// # Errors
/// Returns [`ClaireError::NotFound`] if no matching document exists.
pub async fn get(
    state: &AppState,
    _principal: &Principal,
    sop_id: &str,
    uri: &Uri,
) -> Result<Response<ClaireBody>, ClaireError> {
    let version = query_param(uri, "version");
    let document = state.sops.get(sop_id, version.as_deref()).await?;
    Ok(envelope::ok(document.as_ref()))
}
