//! Thin HTTP dispatch surface for CLAIRE (§4.9, §6).
//!
//! Every request runs the same pipeline: resolve a [`router::Route`],
//! authenticate (except `/health`), call the matching `routes::*` handler,
//! and translate the `Result` into the uniform `{ok, ...}` envelope. The
//! pipeline itself has no business logic — every decision belongs to the
//! component crate the handler delegates to.

mod auth;
mod body;
mod envelope;
mod error;
mod multipart;
mod query;
mod router;
mod routes;
mod service;
pub mod state;

pub use body::ClaireBody;
pub use error::HttpError;
pub use router::Route;
pub use service::{ClaireHttpConfig, ClaireHttpService};
pub use state::AppState;

use bytes::Bytes;
use claire_core::ClaireError;
use http::request::Parts;
use http::{Response, Uri};

/// Run the full request pipeline for an already-collected request.
///
/// Splitting dispatch from body collection keeps this function testable
/// without a live hyper connection (see `service::tests`).
pub async fn dispatch(state: &AppState, parts: Parts, body: Bytes) -> Response<ClaireBody> {
    let route = match router::resolve(&parts.method, parts.uri.path()) {
        Some(route) => route,
        None => {
            return envelope::error(&ClaireError::from(HttpError::NotFound(
                parts.method.to_string(),
                parts.uri.path().to_owned(),
            )));
        }
    };

    if matches!(route, Route::Health) {
        return routes::health::handle();
    }

    let principal = match auth::authenticate(state, &parts).await {
        Ok(principal) => principal,
        Err(err) => return envelope::error(&err),
    };

    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let result = handle_route(state, &principal, route, &parts.uri, content_type, &body).await;
    match result {
        Ok(response) => response,
        Err(err) => envelope::error(&err),
    }
}

async fn handle_route(
    state: &AppState,
    principal: &claire_core::Principal,
    route: Route,
    uri: &Uri,
    content_type: Option<&str>,
    body: &Bytes,
) -> Result<Response<ClaireBody>, ClaireError> {
    match route {
        Route::Health => unreachable!("handled before authentication"),
        Route::ListSops => routes::sops::list(state, principal).await,
        Route::GetSop { sop_id } => routes::sops::get(state, principal, &sop_id, uri).await,
        Route::ListDrafts => {
            let sop_id = query::query_param(uri, "sop_id");
            routes::drafts::list(state, principal, sop_id.as_deref()).await
        }
        Route::CreateDraft => routes::drafts::create(state, principal, body).await,
        Route::UpdateDraft { draft_id } => routes::drafts::update(state, principal, &draft_id, body).await,
        Route::DeleteDraft { draft_id } => routes::drafts::delete(state, principal, &draft_id).await,
        Route::UploadFile => routes::files::upload(state, principal, content_type, body).await,
        Route::PresignFile => routes::files::presign(state, principal, body).await,
        Route::CreateSubmission => routes::eln::create(state, principal, body).await,
        Route::ListSubmissions => routes::eln::list(state, principal, uri).await,
        Route::GetSubmission { submission_id } => routes::eln::get(state, principal, &submission_id).await,
        Route::RuntimeConfig => routes::config::get(state, principal),
        Route::ListGroups => routes::groups::list(state, principal),
    }
}
