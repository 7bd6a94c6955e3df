//! Port traits defining external boundaries.
//!
//! The recorder talks to the network through [`Transport`] and wraps
//! server code through [`Handler`]. Implementations live in `src/adapters/`.

pub mod handler;
pub mod http;
pub mod transport;

pub use handler::Handler;
pub use http::{Form, Headers, HttpRequest, HttpResponse};
pub use transport::{BoxError, ResponseFuture, Transport};
