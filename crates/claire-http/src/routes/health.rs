//! `GET /health` — the only unauthenticated route.

use http::Response;

use crate::body::ClaireBody;
use crate::envelope;

/// The crate version reported on the health response.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the `{status, service, version}` health response.
#[must_use]
pub fn handle() -> Response<ClaireBody> {
    envelope::ok(&serde_json::json!({
        "status": "running",
        "service": "claire",
        "version": VERSION,
    }))
}
