//! Transport port for sending HTTP requests over the network.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::http::{HttpRequest, HttpResponse};

/// Boxed error type returned across port boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Boxed future type alias used by [`Transport`] and
/// [`Handler`](super::handler::Handler) to keep the traits dyn-compatible.
pub type ResponseFuture<'a> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, BoxError>> + Send + 'a>>;

/// Performs HTTP requests against a real endpoint.
///
/// Code written against `dyn Transport` works unchanged whether it is handed
/// a live transport or a recorder-backed one.
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails (connection, protocol, cancellation).
    fn perform<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn perform<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a> {
        (**self).perform(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn perform<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a> {
        (**self).perform(request)
    }
}
