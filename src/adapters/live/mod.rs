//! Live adapters for real network interactions.

pub mod http;

pub use http::LiveTransport;
