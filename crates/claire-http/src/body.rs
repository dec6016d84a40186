//! The response body type every handler in this crate produces.
//!
//! Every CLAIRE response is a fully buffered JSON document, so there is no
//! streaming mode to support — a thin `Full<Bytes>` wrapper is enough.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame};

/// A fully buffered HTTP response body.
#[derive(Debug, Clone)]
pub struct ClaireBody(Option<Bytes>);

impl ClaireBody {
    /// Wrap a pre-serialized JSON payload.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(Some(bytes.into()))
    }

    /// An empty body, for 204-style responses.
    #[must_use]
    pub fn empty() -> Self {
        Self(None)
    }
}

impl Body for ClaireBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().0.take().map(|b| Ok(Frame::data(b))))
    }
}
