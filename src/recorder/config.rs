//! Declarative recorder configuration, read from YAML or the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable prefix used by [`RecorderConfig::from_env`].
pub const ENV_PREFIX: &str = "HTTPVCR_";

/// Optional overrides applied to a [`RecorderBuilder`](super::RecorderBuilder).
///
/// Every field is optional; unset fields leave the builder's value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecorderConfig {
    /// Mode name, validated when the recorder is built.
    pub mode: Option<String>,
    /// Refuse methods outside GET, HEAD, OPTIONS and TRACE.
    pub block_unsafe_methods: Option<bool>,
    /// Allow interactions to be replayed any number of times.
    pub replayable_interactions: Option<bool>,
    /// Store the cassette gzip-compressed.
    pub compression: Option<bool>,
    /// Fail lookups once every match was replayed instead of reusing the last.
    pub strict_replay: Option<bool>,
    /// Delay replayed responses by their recorded duration.
    pub simulate_latency: Option<bool>,
    /// Headers excluded from the default fingerprint.
    pub ignore_headers: Option<Vec<String>>,
}

impl RecorderConfig {
    /// Parses YAML configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed YAML or unknown keys.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads YAML configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise see
    /// [`from_yaml_str`](Self::from_yaml_str).
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        Self::from_yaml_str(&text)
    }

    /// Reads `HTTPVCR_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// See [`from_vars`](Self::from_vars).
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Builds a configuration from `(name, value)` pairs; names without the
    /// `HTTPVCR_` prefix are ignored.
    ///
    /// Recognized: `MODE`, `BLOCK_UNSAFE`, `REPLAYABLE`, `COMPRESSION`,
    /// `STRICT_REPLAY`, `SIMULATE_LATENCY`, and `IGNORE_HEADERS`
    /// (comma-separated).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a boolean variable that does not parse.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (name, value) in vars {
            let Some(key) = name.as_ref().strip_prefix(ENV_PREFIX) else { continue };
            let value = value.as_ref();
            match key {
                "MODE" => config.mode = Some(value.to_string()),
                "BLOCK_UNSAFE" => config.block_unsafe_methods = Some(parse_bool(name.as_ref(), value)?),
                "REPLAYABLE" => config.replayable_interactions = Some(parse_bool(name.as_ref(), value)?),
                "COMPRESSION" => config.compression = Some(parse_bool(name.as_ref(), value)?),
                "STRICT_REPLAY" => config.strict_replay = Some(parse_bool(name.as_ref(), value)?),
                "SIMULATE_LATENCY" => config.simulate_latency = Some(parse_bool(name.as_ref(), value)?),
                "IGNORE_HEADERS" => {
                    config.ignore_headers = Some(
                        value.split(',').map(str::trim).filter(|h| !h.is_empty()).map(String::from).collect(),
                    );
                }
                _ => {}
            }
        }
        Ok(config)
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(Error::Config(format!("{name}: expected a boolean, got {value:?}"))),
    }
}
