//! Record HTTP interactions to cassette files and replay them deterministically.
//!
//! A [`Recorder`] wraps a real [`Transport`] (and optionally a server-side
//! [`Handler`]). Depending on its [`Mode`] each request is answered from the
//! [`Cassette`], sent over the network and captured, or both.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use httpvcr::{HttpRequest, Mode, Recorder, Transport};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let recorder = Arc::new(Recorder::builder("fixtures/users").mode(Mode::RecordOnce).build()?);
//! let transport = recorder.transport();
//! let response = transport.perform(&HttpRequest::parse("GET", "https://example.com/users")?).await?;
//! println!("{}", response.body_text());
//! recorder.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod ports;
pub mod recorder;

pub use adapters::live::LiveTransport;
pub use adapters::recording::{RecorderTransport, RecordingHandler};
pub use cassette::{
    verify_handler, Cassette, DefaultFingerprinter, Fingerprinter, Interaction, RecordedRequest,
    RecordedResponse, ReplayExhaustion, ReplayMismatch, FORMAT_VERSION,
};
pub use error::{Error, Result};
pub use ports::{BoxError, Handler, Headers, HttpRequest, HttpResponse, Transport};
pub use recorder::{HookKind, Mode, Recorder, RecorderBuilder, RecorderConfig};

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    commands::dispatch(&cli.command)
}
