//! `GET /api/v1/config/runtime` — the resolved configuration document, with
//! credential material redacted before it leaves the process.

use claire_core::{ClaireError, Principal};
use http::Response;

use crate::body::ClaireBody;
use crate::envelope;
use crate::state::AppState;

/// Return the frozen runtime configuration, minus `auth.secret`.
///
/// # Errors
/// Returns [`ClaireError::Internal`] if the config document fails to
/// serialize, which should not happen for a document that was already
/// validated at startup.
pub fn get(state: &AppState, _principal: &Principal) -> Result<Response<ClaireBody>, ClaireError> {
    let mut value = serde_json::to_value(state.config.as_ref())
        .map_err(|e| ClaireError::Internal(anyhow::anyhow!(e)))?;
    if let Some(secret) = value.pointer_mut("/auth/secret") {
        *secret = serde_json::Value::Null;
    }
    Ok(envelope::ok(&value))
}
