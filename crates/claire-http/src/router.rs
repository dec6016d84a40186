//! Resolves `(Method, path)` to a [`Route`], extracting path parameters.
//!
//! Deliberately simple: a linear match over a fixed, small endpoint set
//! rather than a general-purpose router.

use http::Method;

/// A matched endpoint, with any path parameters already extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /health`
    Health,
    /// `GET /api/v1/sops`
    ListSops,
    /// `GET /api/v1/sops/{sop_id}`
    GetSop { sop_id: String },
    /// `GET /api/v1/drafts`
    ListDrafts,
    /// `POST /api/v1/drafts`
    CreateDraft,
    /// `PUT /api/v1/drafts/{id}`
    UpdateDraft { draft_id: String },
    /// `DELETE /api/v1/drafts/{id}`
    DeleteDraft { draft_id: String },
    /// `POST /api/v1/files`
    UploadFile,
    /// `POST /api/v1/files/presign`
    PresignFile,
    /// `POST /api/v1/eln`
    CreateSubmission,
    /// `GET /api/v1/eln`
    ListSubmissions,
    /// `GET /api/v1/eln/{id}`
    GetSubmission { submission_id: String },
    /// `GET /api/v1/config/runtime`
    RuntimeConfig,
    /// `GET /api/v1/user-management/groups`
    ListGroups,
}

/// Resolve `method`/`path` to a [`Route`].
///
/// Returns `None` for anything not in the §6 wire API table; the caller
/// turns that into a `NotFound` envelope.
#[must_use]
pub fn resolve(method: &Method, path: &str) -> Option<Route> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        (&Method::GET, ["health"]) => Some(Route::Health),
        (&Method::GET, ["api", "v1", "sops"]) => Some(Route::ListSops),
        (&Method::GET, ["api", "v1", "sops", sop_id]) => Some(Route::GetSop {
            sop_id: (*sop_id).to_owned(),
        }),
        (&Method::GET, ["api", "v1", "drafts"]) => Some(Route::ListDrafts),
        (&Method::POST, ["api", "v1", "drafts"]) => Some(Route::CreateDraft),
        (&Method::PUT, ["api", "v1", "drafts", draft_id]) => Some(Route::UpdateDraft {
            draft_id: (*draft_id).to_owned(),
        }),
        (&Method::DELETE, ["api", "v1", "drafts", draft_id]) => Some(Route::DeleteDraft {
            draft_id: (*draft_id).to_owned(),
        }),
        (&Method::POST, ["api", "v1", "files"]) => Some(Route::UploadFile),
        (&Method::POST, ["api", "v1", "files", "presign"]) => Some(Route::PresignFile),
        (&Method::POST, ["api", "v1", "eln"]) => Some(Route::CreateSubmission),
        (&Method::GET, ["api", "v1", "eln"]) => Some(Route::ListSubmissions),
        (&Method::GET, ["api", "v1", "eln", submission_id]) => Some(Route::GetSubmission {
            submission_id: (*submission_id).to_owned(),
        }),
        (&Method::GET, ["api", "v1", "config", "runtime"]) => Some(Route::RuntimeConfig),
        (&Method::GET, ["api", "v1", "user-management", "groups"]) => Some(Route::ListGroups),
        _ => None,
    }
}
