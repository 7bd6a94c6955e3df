//! Adapters implementing the ports.
//!
//! `live` talks to the real network; `recording` routes traffic through a
//! [`Recorder`](crate::recorder::Recorder).

pub mod live;
pub mod recording;
