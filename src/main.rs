//! Binary entrypoint for the `httpvcr` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    httpvcr::logging::init();
    match httpvcr::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
