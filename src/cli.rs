//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `httpvcr`.
#[derive(Debug, Parser)]
#[command(name = "httpvcr", version, about = "Inspect and maintain HTTP cassettes")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the interactions stored in a cassette.
    Inspect {
        /// Cassette name, without the `.yaml` extension.
        name: String,
        /// Read `<name>.yaml.gz`.
        #[arg(long)]
        compressed: bool,
        /// Print JSON instead of one line per interaction.
        #[arg(long)]
        json: bool,
    },
    /// Store missing fingerprints in a legacy cassette.
    Upgrade {
        /// Cassette name, without the `.yaml` extension.
        name: String,
        /// Read and write `<name>.yaml.gz`.
        #[arg(long)]
        compressed: bool,
    },
}
