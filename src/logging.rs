//! Log output for the `httpvcr` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the application. `HTTPVCR_LOG` takes precedence over `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Filter applied when neither variable is set.
pub const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr fmt subscriber. Does nothing if one is already set.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env("HTTPVCR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
