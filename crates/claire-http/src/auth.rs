//! Bearer token extraction and verification, run once per request before
//! any route handler sees it.

use claire_core::{ClaireError, Principal};
use http::request::Parts;

use crate::error::HttpError;
use crate::state::AppState;

/// Extract the bearer token from `Authorization` and resolve it to a
/// [`Principal`] via the configured [`claire_auth::AuthProvider`].
///
/// # Errors
/// Returns [`ClaireError::AuthInvalid`] if the header is absent or
/// malformed, or whatever the provider returns for an invalid/expired token.
pub async fn authenticate(state: &AppState, parts: &Parts) -> Result<Principal, ClaireError> {
    let token = bearer_token(parts).ok_or(HttpError::MissingToken)?;
    state.auth.verify(token).await.map_err(ClaireError::from)
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = http::Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_should_extract_bearer_token() {
        let parts = parts_with_header(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn test_should_reject_missing_header() {
        let parts = parts_with_header(None);
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_should_reject_non_bearer_scheme() {
        let parts = parts_with_header(Some("Basic abc"));
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_should_reject_empty_bearer_token() {
        let parts = parts_with_header(Some("Bearer "));
        assert_eq!(bearer_token(&parts), None);
    }
}
