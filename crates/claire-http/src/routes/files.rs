//! `/api/v1/files` and `/api/v1/files/presign` — attachment upload.

use bytes::Bytes;
use claire_core::{ClaireError, Principal};
use http::Response;
use serde::Deserialize;

use crate::body::ClaireBody;
use crate::envelope;
use crate::error::HttpError;
use crate::multipart;
use crate::state::AppState;

const DEFAULT_PRESIGN_TTL_SECONDS: u64 = 3600;

/// `POST /api/v1/files` — a multipart-encoded inline upload.
///
/// # Errors
/// Returns [`ClaireError::MalformedBody`] if the body is not well-formed
/// multipart, or whatever [`claire_files::FileStore::upload_inline`] returns
/// on rejection.
pub async fn upload(
    state: &AppState,
    principal: &Principal,
    content_type: Option<&str>,
    body: &Bytes,
) -> Result<Response<ClaireBody>, ClaireError> {
    let content_type = content_type.ok_or_else(|| {
        ClaireError::from(HttpError::MalformedBody("missing Content-Type".to_owned()))
    })?;
    let boundary =
        multipart::extract_boundary(content_type).map_err(ClaireError::from)?;
    let file = multipart::parse_file_field(body, &boundary).map_err(ClaireError::from)?;

    let media_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    let original_name = file.filename.clone().unwrap_or_else(|| "upload".to_owned());

    let record = state
        .files
        .upload_inline(&principal.subject, None, &original_name, &media_type, file.data)
        .await?;

    Ok(envelope::ok(&serde_json::json!({
        "file_id": record.file_id,
        "sha256": record.sha256,
        "size": record.size_bytes,
        "media_type": record.media_type,
    })))
}

#[derive(Debug, Deserialize)]
struct PresignRequest {
    media_type: String,
    size: u64,
}

/// `POST /api/v1/files/presign`.
///
/// # Errors
/// Returns [`ClaireError::FileTooLarge`] or [`ClaireError::MediaTypeRejected`]
/// if the declared size/media type is rejected up front.
pub async fn presign(
    state: &AppState,
    principal: &Principal,
    body: &Bytes,
) -> Result<Response<ClaireBody>, ClaireError> {
    let request: PresignRequest =
        serde_json::from_slice(body).map_err(|e| HttpError::MalformedBody(e.to_string()))?;

    let reservation = state
        .files
        .presign_upload(
            &principal.subject,
            None,
            &request.media_type,
            request.size,
            DEFAULT_PRESIGN_TTL_SECONDS,
        )
        .await?;

    Ok(envelope::ok(&serde_json::json!({
        "url": reservation.url,
        "file_id": reservation.file_id,
        "expires_at": reservation.expires_at,
    })))
}
