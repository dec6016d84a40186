//! Shared claim handling: group-to-permission resolution and JWT header
//! inspection that both providers need before `jsonwebtoken` ever sees a
//! signature.

use std::collections::HashMap;

use claire_core::{GroupConfig, Principal};

use crate::error::AuthError;

/// Registered JWT claims common to both providers, plus the group list each
/// carries under a different claim name (`cognito:groups` vs `groups`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CommonClaims {
    /// Subject identifier.
    pub sub: String,
    /// Username, under whichever claim name the provider uses.
    #[serde(default, alias = "cognito:username")]
    pub username: String,
    /// Email address, if present.
    #[serde(default)]
    pub email: Option<String>,
    /// Group memberships, under whichever claim name the provider uses.
    #[serde(default, alias = "cognito:groups")]
    pub groups: Vec<String>,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Not-before, seconds since epoch.
    #[serde(default)]
    pub nbf: Option<i64>,
    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,
    /// Audience.
    #[serde(default)]
    pub aud: Option<String>,
}

/// Resolve a principal's derived permissions from its group memberships.
///
/// Order of `permissions` is the union of each group's permission list in
/// the order groups appear on the token, de-duplicated by first occurrence.
/// A principal holding the literal permission `*` is flagged `is_admin`.
#[must_use]
pub fn resolve_principal(
    claims: &CommonClaims,
    group_config: &HashMap<String, GroupConfig>,
) -> Principal {
    let mut permissions = Vec::new();
    for group in &claims.groups {
        if let Some(cfg) = group_config.get(group) {
            for permission in &cfg.permissions {
                if !permissions.contains(permission) {
                    permissions.push(permission.clone());
                }
            }
        }
    }
    let is_admin = permissions.iter().any(|p| p == "*");

    Principal {
        subject: claims.sub.clone(),
        username: claims.username.clone(),
        email: claims.email.clone(),
        groups: claims.groups.clone(),
        permissions,
        is_admin,
    }
}

/// Inspect a JWT's unverified header for a `dev` flag, without validating
/// its signature.
///
/// The standard `jsonwebtoken::Header` only models registered fields, so the
/// first segment is decoded and parsed independently to check this
/// deployment-specific extension.
///
/// # Errors
/// Returns [`AuthError::Invalid`] if the token is not well-formed.
pub fn header_declares_dev_mode(token: &str) -> Result<bool, AuthError> {
    use base64::Engine;

    let header_segment = token
        .split('.')
        .next()
        .ok_or_else(|| AuthError::Invalid("malformed token".to_owned()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|e| AuthError::Invalid(format!("malformed header: {e}")))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::Invalid(format!("malformed header: {e}")))?;
    Ok(value
        .get("dev")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_config(permissions: &[&str]) -> HashMap<String, GroupConfig> {
        let mut map = HashMap::new();
        map.insert(
            "RESEARCHERS".to_owned(),
            GroupConfig {
                description: String::new(),
                permissions: permissions.iter().map(|s| (*s).to_owned()).collect(),
            },
        );
        map
    }

    #[test]
    fn test_should_resolve_permissions_from_groups() {
        let claims = CommonClaims {
            sub: "u-1".to_owned(),
            username: "alice".to_owned(),
            email: None,
            groups: vec!["RESEARCHERS".to_owned()],
            exp: 0,
            nbf: None,
            iss: None,
            aud: None,
        };
        let principal = resolve_principal(&claims, &group_config(&["submit:SOP001", "view:own"]));
        assert_eq!(principal.permissions, vec!["submit:SOP001", "view:own"]);
        assert!(!principal.is_admin);
    }

    #[test]
    fn test_should_flag_admin_on_wildcard_permission() {
        let claims = CommonClaims {
            sub: "u-1".to_owned(),
            username: "root".to_owned(),
            email: None,
            groups: vec!["RESEARCHERS".to_owned()],
            exp: 0,
            nbf: None,
            iss: None,
            aud: None,
        };
        let principal = resolve_principal(&claims, &group_config(&["*"]));
        assert!(principal.is_admin);
    }

    #[test]
    fn test_should_ignore_unknown_groups() {
        let claims = CommonClaims {
            sub: "u-1".to_owned(),
            username: "bob".to_owned(),
            email: None,
            groups: vec!["GHOSTS".to_owned()],
            exp: 0,
            nbf: None,
            iss: None,
            aud: None,
        };
        let principal = resolve_principal(&claims, &group_config(&["submit:*"]));
        assert!(principal.permissions.is_empty());
    }

    #[test]
    fn test_should_detect_dev_header_flag() {
        use base64::Engine;
        let header = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(br#"{"alg":"HS256","typ":"JWT","dev":true}"#);
        let token = format!("{header}.payload.sig");
        assert!(header_declares_dev_mode(&token).unwrap());
    }

    #[test]
    fn test_should_default_dev_flag_false_when_absent() {
        use base64::Engine;
        let header =
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let token = format!("{header}.payload.sig");
        assert!(!header_declares_dev_mode(&token).unwrap());
    }
}
