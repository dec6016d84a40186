//! `GET /api/v1/user-management/groups` — the group-to-permission mapping
//! sourced from config (§4.1 `auth.groups`), read-only from this surface's
//! perspective; group membership itself is managed by the identity provider.

use claire_core::{ClaireError, Principal};
use http::Response;
use serde::Serialize;

use crate::body::ClaireBody;
use crate::envelope;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct GroupSummary {
    name: String,
    description: String,
    permissions: Vec<String>,
}

/// List every configured group with its description and granted permissions.
///
/// # Errors
/// This handler cannot fail; it is infallible over a frozen config, but
/// returns a `Result` to match the other route handlers' signature.
pub fn list(state: &AppState, _principal: &Principal) -> Result<Response<ClaireBody>, ClaireError> {
    let mut groups: Vec<GroupSummary> = state
        .config
        .auth
        .groups
        .iter()
        .map(|(name, config)| GroupSummary {
            name: name.clone(),
            description: config.description.clone(),
            permissions: config.permissions.clone(),
        })
        .collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(envelope::ok(&groups))
}
