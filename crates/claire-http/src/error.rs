//! Errors raised by the HTTP layer itself, before a request ever reaches a
//! component crate (malformed JSON, missing bearer token, unknown route).

use claire_core::ClaireError;

/// An error produced while parsing or routing a request, distinct from the
/// component-level [`ClaireError`]s a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// No `Authorization: Bearer ...` header was present.
    #[error("missing bearer token")]
    MissingToken,

    /// The request body did not parse as the shape the route expects.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// No route matches this method/path.
    #[error("no such route: {0} {1}")]
    NotFound(String, String),
}

impl From<HttpError> for ClaireError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::MissingToken => Self::AuthInvalid("missing bearer token".to_owned()),
            HttpError::MalformedBody(msg) => Self::MalformedBody(msg),
            HttpError::NotFound(method, path) => Self::NotFound(format!("{method} {path}")),
        }
    }
}
