//! Execution mode policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process-wide execution mode, fixed when the engine is created
///
/// `Checked` and `CheckedVerbose` behave identically as far as the cache is
/// concerned; the verbose variant only emits per-dependency diagnostics.
///
/// Deserializes from any name [`FromStr`] accepts, or from the bare numbers
/// `0`, `1` and `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case", try_from = "ModeRepr")]
pub enum Mode {
    /// Ship-the-snapshot mode: every registration rebuilds, nothing is recorded
    #[cfg_attr(feature = "clap", value(alias = "production", alias = "prod", alias = "0"))]
    Trusted,

    /// Compare recorded and current timestamps before rebuilding
    #[default]
    #[cfg_attr(feature = "clap", value(alias = "development", alias = "dev", alias = "1"))]
    Checked,

    /// Like `Checked`, with per-dependency diagnostics
    #[cfg_attr(feature = "clap", value(alias = "debug", alias = "verbose", alias = "2"))]
    CheckedVerbose,
}

/// Wire form of [`Mode`]: a name or a numeric level
#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Number(u64),
    Name(String),
}

impl TryFrom<ModeRepr> for Mode {
    type Error = ParseModeError;

    fn try_from(repr: ModeRepr) -> Result<Self, Self::Error> {
        match repr {
            ModeRepr::Number(level) => level.to_string().parse(),
            ModeRepr::Name(name) => name.parse(),
        }
    }
}

impl Mode {
    /// Whether invalidation logic and the timestamp store are used at all
    pub fn performs_checks(self) -> bool {
        !matches!(self, Mode::Trusted)
    }

    /// Whether per-dependency diagnostics are emitted
    pub fn is_verbose(self) -> bool {
        matches!(self, Mode::CheckedVerbose)
    }

    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Trusted => "trusted",
            Mode::Checked => "checked",
            Mode::CheckedVerbose => "checked-verbose",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a mode name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown execution mode {0:?} (expected trusted, checked or checked-verbose)")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trusted" | "production" | "prod" | "0" => Ok(Mode::Trusted),
            "checked" | "development" | "dev" | "1" => Ok(Mode::Checked),
            "checked-verbose" | "verbose" | "debug" | "2" => Ok(Mode::CheckedVerbose),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("production".parse::<Mode>().unwrap(), Mode::Trusted);
        assert_eq!("0".parse::<Mode>().unwrap(), Mode::Trusted);
        assert_eq!("Development".parse::<Mode>().unwrap(), Mode::Checked);
        assert_eq!("2".parse::<Mode>().unwrap(), Mode::CheckedVerbose);
        assert_eq!("debug".parse::<Mode>().unwrap(), Mode::CheckedVerbose);
        assert!("staging".parse::<Mode>().is_err());
    }

    #[test]
    fn test_policy_flags() {
        assert!(!Mode::Trusted.performs_checks());
        assert!(Mode::Checked.performs_checks());
        assert!(Mode::CheckedVerbose.performs_checks());
        assert!(!Mode::Checked.is_verbose());
        assert!(Mode::CheckedVerbose.is_verbose());
    }

    #[test]
    fn test_serde_aliases() {
        let mode: Mode = serde_json::from_str(r#""production""#).unwrap();
        assert_eq!(mode, Mode::Trusted);
        let mode: Mode = serde_json::from_str(r#""checked-verbose""#).unwrap();
        assert_eq!(mode, Mode::CheckedVerbose);
        assert_eq!(serde_json::to_string(&Mode::Checked).unwrap(), r#""checked""#);
    }

    #[test]
    fn test_serde_numeric_levels() {
        assert_eq!(serde_json::from_str::<Mode>("0").unwrap(), Mode::Trusted);
        assert_eq!(serde_json::from_str::<Mode>("1").unwrap(), Mode::Checked);
        assert_eq!(serde_json::from_str::<Mode>(r#""2""#).unwrap(), Mode::CheckedVerbose);
        assert!(serde_json::from_str::<Mode>("3").is_err());
        assert!(serde_json::from_str::<Mode>(r#""staging""#).is_err());
    }

    #[test]
    fn test_engine_config_accepts_numeric_mode() {
        let config: crate::EngineConfig =
            serde_json::from_str(r#"{"mode": 2, "persist_ordering": "after-rebuild"}"#).unwrap();
        assert_eq!(config.mode, Mode::CheckedVerbose);
    }

    #[cfg(feature = "clap")]
    #[test]
    fn test_clap_numeric_levels() {
        use clap::ValueEnum;
        assert_eq!(<Mode as ValueEnum>::from_str("0", true).unwrap(), Mode::Trusted);
        assert_eq!(<Mode as ValueEnum>::from_str("prod", true).unwrap(), Mode::Trusted);
        assert_eq!(<Mode as ValueEnum>::from_str("2", true).unwrap(), Mode::CheckedVerbose);
    }
}
