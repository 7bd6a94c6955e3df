//! Command dispatch and handlers.

pub mod inspect;
pub mod upgrade;

use crate::cassette::Cassette;
use crate::cli::Command;

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Inspect { name, compressed, json } => inspect::run(name, *compressed, *json),
        Command::Upgrade { name, compressed } => upgrade::run(name, *compressed),
    }
}

/// Loads the named cassette, mapping failures to a printable message.
fn open(name: &str, compressed: bool) -> Result<Cassette, String> {
    let cassette = Cassette::new(name).with_compression(compressed);
    cassette.load().map_err(|e| e.to_string())?;
    Ok(cassette)
}
