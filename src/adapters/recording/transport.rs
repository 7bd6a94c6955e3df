//! Recording adapter for the `Transport` port.

use std::sync::Arc;

use crate::ports::{BoxError, HttpRequest, ResponseFuture, Transport};
use crate::recorder::Recorder;

/// Drop-in transport that resolves every request through a [`Recorder`].
///
/// Recorder errors are boxed; downcast to [`crate::Error`] to inspect them.
#[derive(Debug, Clone)]
pub struct RecorderTransport {
    recorder: Arc<Recorder>,
}

impl RecorderTransport {
    /// Creates a transport backed by `recorder`.
    #[must_use]
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }

    /// The recorder behind this transport.
    #[must_use]
    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }
}

impl Transport for RecorderTransport {
    fn perform<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a> {
        Box::pin(async move { self.recorder.round_trip(request).await.map_err(BoxError::from) })
    }
}
