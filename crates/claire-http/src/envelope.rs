//! The uniform `{ok, data}` / `{ok, error}` response envelope (§4.9).

use claire_core::{ClaireError, ValidationIssue};
use serde::Serialize;

use crate::body::ClaireBody;

/// The body of an error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// The wire error code, e.g. `"ValidationFailed"`.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Structured detail, present for `ValidationFailed` (a list of
    /// `{path, code, message}`) and absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationIssue>>,
}

/// Serialize `value` into a `{ok: true, data: ...}` envelope at HTTP 200.
pub fn ok<T: Serialize>(value: &T) -> http::Response<ClaireBody> {
    respond(200, &serde_json::json!({"ok": true, "data": value}))
}

/// Serialize `value` into a `{ok: true, data: ...}` envelope at the given
/// status, for endpoints that don't return 200 on success (none currently
/// do, but this keeps the envelope helper general).
pub fn ok_with_status<T: Serialize>(status: u16, value: &T) -> http::Response<ClaireBody> {
    respond(status, &serde_json::json!({"ok": true, "data": value}))
}

/// Translate a [`ClaireError`] into its `{ok: false, error: {...}}` envelope
/// and the §7 HTTP status code.
pub fn error(err: &ClaireError) -> http::Response<ClaireBody> {
    let details = match err {
        ClaireError::ValidationFailed(issues) => Some(issues.clone()),
        _ => None,
    };
    let body = ErrorBody {
        code: err.code(),
        message: err.to_string(),
        details,
    };
    respond(err.status_code(), &serde_json::json!({"ok": false, "error": body}))
}

fn respond(status: u16, value: &serde_json::Value) -> http::Response<ClaireBody> {
    let bytes = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    http::Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(ClaireBody::from_bytes(bytes))
        .expect("status and headers are always valid")
}
