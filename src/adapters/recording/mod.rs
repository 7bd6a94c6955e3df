//! Recording adapters that route traffic through a recorder.

pub mod middleware;
pub mod transport;

pub use middleware::RecordingHandler;
pub use transport::RecorderTransport;
