//! `httpvcr upgrade` command.

/// Execute the `upgrade` command.
///
/// # Errors
///
/// Returns an error string if the cassette cannot be loaded or saved.
pub fn run(name: &str, compressed: bool) -> Result<(), String> {
    let cassette = super::open(name, compressed)?;
    let upgraded = cassette.upgrade().map_err(|e| e.to_string())?;
    if upgraded {
        println!("Upgraded {} ({} interaction(s)).", cassette.file().display(), cassette.len());
    } else {
        println!("{} is already up to date.", cassette.file().display());
    }
    Ok(())
}
