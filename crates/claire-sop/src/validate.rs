//! Field and cross-field validation against a submission body.

use std::collections::HashMap;

use claire_core::ValidationIssue;
use regex::Regex;
use serde_json::Value;

use crate::document::{CrossFieldRule, Field, FieldType, SopDocument};

/// What the validator knows about an attachment referenced from a
/// submission body, without depending on `claire-files` directly.
#[derive(Debug, Clone)]
pub struct AttachmentInfo {
    /// The attachment's media type, as recorded by the File Service.
    pub media_type: String,
    /// The attachment's size in bytes.
    pub size_bytes: u64,
}

fn get_path<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = body;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn validate_field(
    field: &Field,
    body: &Value,
    attachments: &HashMap<String, AttachmentInfo>,
    issues: &mut Vec<ValidationIssue>,
) {
    let value = get_path(body, &field.path);

    if value.is_none() || value.is_some_and(Value::is_null) {
        if field.required {
            issues.push(ValidationIssue::new(
                &field.path,
                "REQUIRED_MISSING",
                format!("{} is required", field.label),
            ));
        }
        return;
    }
    let value = value.expect("checked above");

    match &field.field_type {
        FieldType::Text => {
            let Some(text) = value.as_str() else {
                issues.push(type_mismatch(&field.path, "string"));
                return;
            };
            if let Some(pattern) = &field.pattern {
                match Regex::new(pattern) {
                    Ok(re) if !re.is_match(text) => {
                        issues.push(ValidationIssue::new(
                            &field.path,
                            "PATTERN_MISMATCH",
                            format!("{} does not match the required pattern", field.label),
                        ));
                    }
                    Ok(_) => {}
                    Err(_) => issues.push(ValidationIssue::new(
                        &field.path,
                        "PATTERN_MISMATCH",
                        "field pattern is not a valid regular expression".to_owned(),
                    )),
                }
            }
        }
        FieldType::Number { min, max } => {
            let Some(number) = value.as_f64() else {
                issues.push(type_mismatch(&field.path, "number"));
                return;
            };
            if min.is_some_and(|m| number < m) || max.is_some_and(|m| number > m) {
                issues.push(ValidationIssue::new(
                    &field.path,
                    "OUT_OF_RANGE",
                    format!("{} is out of the allowed range", field.label),
                ));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                issues.push(type_mismatch(&field.path, "boolean"));
            }
        }
        FieldType::Date => {
            let Some(text) = value.as_str() else {
                issues.push(type_mismatch(&field.path, "date string"));
                return;
            };
            if chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_err() {
                issues.push(ValidationIssue::new(
                    &field.path,
                    "TYPE_MISMATCH",
                    format!("{} is not a valid YYYY-MM-DD date", field.label),
                ));
            }
        }
        FieldType::Enum { values } => {
            let Some(text) = value.as_str() else {
                issues.push(type_mismatch(&field.path, "string"));
                return;
            };
            if !values.iter().any(|v| v == text) {
                issues.push(ValidationIssue::new(
                    &field.path,
                    "ENUM_INVALID",
                    format!("{} must be one of {:?}", field.label, values),
                ));
            }
        }
        FieldType::Attachment {
            allowed_media_types,
            max_size_bytes,
        } => {
            let Some(file_id) = value.as_str() else {
                issues.push(type_mismatch(&field.path, "attachment reference"));
                return;
            };
            let Some(attachment) = attachments.get(file_id) else {
                issues.push(ValidationIssue::new(
                    &field.path,
                    "ATTACHMENT_MISSING",
                    format!("{} references an unknown attachment", field.label),
                ));
                return;
            };
            if !allowed_media_types.is_empty()
                && !allowed_media_types.contains(&attachment.media_type)
            {
                issues.push(ValidationIssue::new(
                    &field.path,
                    "ATTACHMENT_TYPE_REJECTED",
                    format!("{} has an unsupported media type", field.label),
                ));
            }
            if let Some(limit) = max_size_bytes {
                if attachment.size_bytes > *limit {
                    issues.push(ValidationIssue::new(
                        &field.path,
                        "ATTACHMENT_TOO_LARGE",
                        format!("{} exceeds the allowed size", field.label),
                    ));
                }
            }
        }
    }
}

fn type_mismatch(path: &str, expected: &str) -> ValidationIssue {
    ValidationIssue::new(path, "TYPE_MISMATCH", format!("expected a {expected}"))
}

fn validate_cross_field_rule(rule: &CrossFieldRule, body: &Value, issues: &mut Vec<ValidationIssue>) {
    match rule {
        CrossFieldRule::AllOrNone { fields } => {
            let present: Vec<bool> = fields
                .iter()
                .map(|path| get_path(body, path).is_some_and(|v| !v.is_null()))
                .collect();
            let any_present = present.iter().any(|p| *p);
            let all_present = present.iter().all(|p| *p);
            if any_present && !all_present {
                issues.push(ValidationIssue::new(
                    fields.join(","),
                    "CROSS_FIELD_FAILED",
                    "fields must all be present or all be absent together".to_owned(),
                ));
            }
        }
        CrossFieldRule::RequiredIf {
            when_field,
            when_value,
            then_field,
        } => {
            let gate = get_path(body, when_field).and_then(Value::as_str);
            if gate == Some(when_value.as_str())
                && get_path(body, then_field).is_none_or(|v| v.is_null())
            {
                issues.push(ValidationIssue::new(
                    then_field,
                    "CROSS_FIELD_FAILED",
                    format!("{then_field} is required when {when_field} is {when_value}"),
                ));
            }
        }
    }
}

/// Validate `body` against `document`'s field rules and cross-field rules.
///
/// `attachments` resolves every attachment file id referenced in `body` to
/// its media type and size, as looked up by the caller (typically
/// `claire-submissions`) from the File Service.
#[must_use]
pub fn validate(
    document: &SopDocument,
    body: &Value,
    attachments: &HashMap<String, AttachmentInfo>,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for field in document.fields() {
        validate_field(field, body, attachments, &mut issues);
    }
    for rule in &document.cross_field_rules {
        validate_cross_field_rule(rule, body, &mut issues);
    }
    issues
}
