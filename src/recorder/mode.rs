//! Recorder modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Policy deciding, for a recorder's lifetime, whether requests are replayed,
/// recorded, both, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    /// Record into a new cassette; replay from an existing one.
    #[default]
    RecordOnce,
    /// Always hit the real transport and capture every exchange.
    RecordOnly,
    /// Only replay; a miss is an error.
    ReplayOnly,
    /// Replay when possible and record whatever does not match.
    ReplayWithNewEpisodes,
    /// Forward everything live, touching nothing.
    Passthrough,
}

impl Mode {
    /// Every mode, in declaration order.
    pub const ALL: [Self; 5] =
        [Self::RecordOnce, Self::RecordOnly, Self::ReplayOnly, Self::ReplayWithNewEpisodes, Self::Passthrough];

    /// Kebab-case name, as accepted by [`FromStr`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RecordOnce => "record-once",
            Self::RecordOnly => "record-only",
            Self::ReplayOnly => "replay-only",
            Self::ReplayWithNewEpisodes => "replay-with-new-episodes",
            Self::Passthrough => "passthrough",
        }
    }

    /// Whether a recorder in this mode captures exchanges, given whether its
    /// cassette was created in this process.
    #[must_use]
    pub fn is_recording(self, new_cassette: bool) -> bool {
        match self {
            Self::RecordOnly | Self::ReplayWithNewEpisodes => true,
            Self::RecordOnce => new_cassette,
            Self::ReplayOnly | Self::Passthrough => false,
        }
    }

    /// Whether a recorder in this mode consults the cassette before the network.
    #[must_use]
    pub fn permits_replay(self) -> bool {
        !matches!(self, Self::RecordOnly | Self::Passthrough)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    /// Accepts kebab-case, snake_case or `CamelCase` names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String =
            s.trim().chars().filter(|c| !matches!(c, '-' | '_' | ' ')).collect::<String>().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().replace('-', "") == normalized)
            .ok_or_else(|| Error::InvalidMode(s.to_string()))
    }
}

impl TryFrom<String> for Mode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.as_str().to_string()
    }
}

/// Numeric codes `0..=4`, in declaration order.
impl TryFrom<i64> for Mode {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or_else(|| Error::InvalidMode(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_depends_on_mode_and_freshness() {
        assert!(Mode::RecordOnce.is_recording(true));
        assert!(!Mode::RecordOnce.is_recording(false));
        assert!(Mode::RecordOnly.is_recording(false));
        assert!(Mode::ReplayWithNewEpisodes.is_recording(false));
        assert!(!Mode::ReplayOnly.is_recording(true));
        assert!(!Mode::Passthrough.is_recording(true));
    }

    #[test]
    fn replay_is_skipped_only_by_record_only_and_passthrough() {
        let replaying: Vec<Mode> = Mode::ALL.into_iter().filter(|m| m.permits_replay()).collect();
        assert_eq!(replaying, vec![Mode::RecordOnce, Mode::ReplayOnly, Mode::ReplayWithNewEpisodes]);
    }

    #[test]
    fn parses_names_in_several_spellings() {
        assert_eq!("replay-only".parse::<Mode>().unwrap(), Mode::ReplayOnly);
        assert_eq!("ReplayWithNewEpisodes".parse::<Mode>().unwrap(), Mode::ReplayWithNewEpisodes);
        assert_eq!("record_once".parse::<Mode>().unwrap(), Mode::RecordOnce);
        assert_eq!(" PASSTHROUGH ".parse::<Mode>().unwrap(), Mode::Passthrough);
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn unknown_values_are_invalid_mode() {
        assert!(matches!("rewind".parse::<Mode>(), Err(Error::InvalidMode(s)) if s == "rewind"));
        assert!(matches!(Mode::try_from(5), Err(Error::InvalidMode(_))));
        assert!(matches!(Mode::try_from(-1), Err(Error::InvalidMode(_))));
        assert_eq!(Mode::try_from(2).unwrap(), Mode::ReplayOnly);
    }

    #[test]
    fn serde_uses_kebab_names() {
        assert_eq!(serde_yaml::to_string(&Mode::ReplayOnly).unwrap().trim(), "replay-only");
        let mode: Mode = serde_yaml::from_str("record-only").unwrap();
        assert_eq!(mode, Mode::RecordOnly);
        assert!(serde_yaml::from_str::<Mode>("bogus").is_err());
    }
}
