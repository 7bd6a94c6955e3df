//! Handler port for serving inbound HTTP requests.

use super::http::HttpRequest;
use super::transport::ResponseFuture;

/// Serves inbound requests, the server-side counterpart of
/// [`Transport`](super::transport::Transport).
pub trait Handler: Send + Sync {
    /// Produces the response for an inbound request.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot produce a response.
    fn handle<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a>;
}

impl<F> Handler for F
where
    F: Fn(&HttpRequest) -> Result<super::http::HttpResponse, super::transport::BoxError>
        + Send
        + Sync,
{
    fn handle<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a> {
        let result = self(request);
        Box::pin(async move { result })
    }
}
