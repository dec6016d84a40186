//! Object key composition, kept as a pure function of its inputs so it can
//! be the most-tested module in this crate. Normalization rules are fixed
//! globally, not by any individual SOP.

use chrono::{DateTime, Utc};
use claire_sop::SopDocument;
use serde_json::Value;

use crate::error::SubmissionsError;

fn get_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = body;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn value_as_component_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Normalize one filename component's raw value: trim, optionally lowercase,
/// collapse whitespace runs to `_`, then drop any character outside
/// `[A-Za-z0-9._-]`.
#[must_use]
pub fn normalize_component(raw: &str, lowercase: bool) -> String {
    let trimmed = raw.trim();
    let cased = if lowercase {
        trimmed.to_lowercase()
    } else {
        trimmed.to_owned()
    };
    let whitespace_replaced: String = cased
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    whitespace_replaced
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

/// Format the monotonic timestamp component: UTC `YYYYMMDDTHHMMSSZ`.
#[must_use]
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Compose the object key for a submission, per the declared
/// `filename_components` order on `sop`.
///
/// The returned key is relative to the `eln` bucket namespace (the bucket
/// segment and org prefix are added by the storage backend): shape is
/// `{sop_id}/{submitter}-{component1}-...-{timestamp}-{nonce}.json`.
///
/// # Errors
/// Returns [`SubmissionsError::ValidationFailed`] if a declared filename
/// component's field is absent from `body` (this should never happen for a
/// body that already passed field validation, since filename-component
/// fields are implicitly required for key composition).
pub fn compose_object_key(
    sop: &SopDocument,
    submitter: &str,
    body: &Value,
    now: DateTime<Utc>,
    nonce: &str,
) -> Result<String, SubmissionsError> {
    let mut components = Vec::with_capacity(sop.filename_components.len());
    for component in &sop.filename_components {
        let raw = get_path(body, &component.field_path).ok_or_else(|| {
            SubmissionsError::KeyComposition(format!(
                "filename component field {} is missing from the submission body",
                component.field_path
            ))
        })?;
        let raw_string = value_as_component_string(raw);
        components.push(normalize_component(&raw_string, component.lowercase));
    }

    let submitter_normalized = normalize_component(submitter, false);
    let mut segments = vec![submitter_normalized];
    segments.extend(components);
    segments.push(format_timestamp(now));
    segments.push(nonce.to_owned());

    Ok(format!("{}/{}.json", sop.sop_id, segments.join("-")))
}
