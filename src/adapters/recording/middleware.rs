//! Recording adapter for the `Handler` port.

use std::sync::Arc;

use crate::ports::{BoxError, Handler, HttpRequest, ResponseFuture};
use crate::recorder::Recorder;

/// Handler middleware that captures every exchange served by the wrapped handler.
pub struct RecordingHandler {
    inner: Box<dyn Handler>,
    recorder: Arc<Recorder>,
}

impl RecordingHandler {
    /// Wraps `inner` so its exchanges are captured by `recorder`.
    pub fn new(inner: Box<dyn Handler>, recorder: Arc<Recorder>) -> Self {
        Self { inner, recorder }
    }
}

impl Handler for RecordingHandler {
    fn handle<'a>(&'a self, request: &'a HttpRequest) -> ResponseFuture<'a> {
        Box::pin(async move {
            self.recorder.capture_inbound(request, self.inner.as_ref()).await.map_err(BoxError::from)
        })
    }
}
