//! Error types shared by the cassette store and the recorder.

use std::path::PathBuf;

use crate::ports::BoxError;

/// Convenience alias for results produced by this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All errors surfaced by cassettes, the recorder and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cassette file does not exist on disk.
    #[error("requested cassette not found: {}", path.display())]
    CassetteNotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// The cassette file declares a format version this reader does not support.
    #[error(
        "unsupported cassette version format: found version {found}, \
         but reader supports version {supported}"
    )]
    UnsupportedFormat {
        /// Version found in the file (0 when absent).
        found: u64,
        /// The single version this reader supports.
        supported: u32,
    },

    /// No recorded interaction matches the request.
    #[error("requested interaction not found")]
    InteractionNotFound,

    /// The recorder was configured with a mode it does not know.
    #[error("invalid recorder mode: {0}")]
    InvalidMode(String),

    /// A request with a method outside GET/HEAD/OPTIONS/TRACE was blocked.
    #[error("request method is not safe for the real transport: {0}")]
    UnsafeMethod(String),

    /// Reading or writing the cassette file failed.
    #[error("cassette I/O failed for {}: {source}", path.display())]
    Io {
        /// File being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The cassette file could not be decoded.
    #[error("failed to decode cassette file {}: {source}", path.display())]
    Decode {
        /// File being decoded.
        path: PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// The cassette could not be encoded for writing.
    #[error("failed to encode cassette: {0}")]
    Encode(#[source] serde_yaml::Error),

    /// A recorded request carries a URL that does not parse.
    #[error("failed to parse request URL {url}: {source}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },

    /// The fingerprint function failed for a request.
    #[error("failed to fingerprint request: {0}")]
    Fingerprint(#[source] BoxError),

    /// The real transport or the wrapped handler failed.
    #[error("transport failed: {0}")]
    Transport(#[source] BoxError),

    /// A hook aborted its lifecycle chain.
    #[error(transparent)]
    Hook(BoxError),

    /// A configuration value could not be parsed.
    #[error("invalid recorder configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns true when no recorded interaction matched the request.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::InteractionNotFound)
    }

    /// Returns true when the cassette file was missing.
    #[must_use]
    pub fn is_cassette_not_found(&self) -> bool {
        matches!(self, Self::CassetteNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_errors_surface_verbatim() {
        let err = Error::Hook("redaction failed".into());
        assert_eq!(err.to_string(), "redaction failed");
    }

    #[test]
    fn not_found_predicates_are_distinct() {
        let missing = Error::CassetteNotFound { path: PathBuf::from("fixtures/none.yaml") };
        assert!(missing.is_cassette_not_found());
        assert!(!missing.is_not_found());
        assert!(Error::InteractionNotFound.is_not_found());
        assert!(!Error::InteractionNotFound.is_cassette_not_found());
    }

    #[test]
    fn unsupported_format_names_both_versions() {
        let err = Error::UnsupportedFormat { found: 1, supported: 2 };
        let msg = err.to_string();
        assert!(msg.contains("found version 1"));
        assert!(msg.contains("supports version 2"));
    }
}
