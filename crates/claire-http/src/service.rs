//! The hyper `Service` implementation tying [`crate::dispatch`] to a real
//! connection: body collection, a request-id assigned per call, and common
//! response headers.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error};
use uuid::Uuid;

use crate::body::ClaireBody;
use crate::state::AppState;

/// Static service-level configuration, distinct from the frozen
/// [`claire_core::ClaireConfig`] document `AppState` carries.
#[derive(Debug, Clone, Default)]
pub struct ClaireHttpConfig {
    /// Server name reported on every response's `Server` header.
    pub server_name: String,
}

/// Binds [`crate::dispatch`] to hyper's `Service` trait for a single
/// listening socket.
#[derive(Debug, Clone)]
pub struct ClaireHttpService {
    state: Arc<AppState>,
    config: Arc<ClaireHttpConfig>,
}

impl ClaireHttpService {
    /// Construct a service over the given application state.
    #[must_use]
    pub fn new(state: Arc<AppState>, config: ClaireHttpConfig) -> Self {
        Self {
            state,
            config: Arc::new(config),
        }
    }
}

impl Service<http::Request<Incoming>> for ClaireHttpService {
    type Response = http::Response<ClaireBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let state = Arc::clone(&self.state);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();
            let (parts, incoming) = req.into_parts();
            let method = parts.method.clone();
            let path = parts.uri.path().to_owned();

            debug!(%method, %path, request_id, "handling request");

            let body = match incoming.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    error!(error = %e, request_id, "failed to collect request body");
                    let err = claire_core::ClaireError::Internal(anyhow::anyhow!(e));
                    let response = crate::envelope::error(&err);
                    return Ok(add_common_headers(response, &request_id, &config));
                }
            };

            let response = crate::dispatch(&state, parts, body).await;
            Ok(add_common_headers(response, &request_id, &config))
        })
    }
}

fn add_common_headers(
    mut response: http::Response<ClaireBody>,
    request_id: &str,
    config: &ClaireHttpConfig,
) -> http::Response<ClaireBody> {
    let headers = response.headers_mut();
    if let Ok(value) = http::HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", value);
    }
    if !config.server_name.is_empty() {
        if let Ok(value) = http::HeaderValue::from_str(&config.server_name) {
            headers.insert(http::header::SERVER, value);
        }
    }
    response
}
