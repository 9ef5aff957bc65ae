//! Logger configuration

mod presets;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `EnvFilter` directive string, e.g. `info,keyshift_credential=debug`
    pub level: String,
    /// Output format
    pub format: Format,
    /// Which parts of each record are rendered
    pub display: DisplayConfig,
    /// Where records are written
    pub writer: WriterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Compact,
            display: DisplayConfig::default(),
            writer: WriterConfig::Stderr,
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line human-readable output
    #[default]
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Display toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// ANSI colors (ignored for transcript files)
    pub colors: bool,
    /// Timestamps
    pub time: bool,
    /// Event target (module path)
    pub target: bool,
    /// Source file and line
    pub source: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            colors: true,
            time: true,
            target: false,
            source: false,
        }
    }
}

/// Log destination
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WriterConfig {
    /// Standard error
    #[default]
    Stderr,
    /// Transcript file only
    File {
        /// Transcript path
        path: PathBuf,
    },
    /// Standard error and a transcript file
    Tee {
        /// Transcript path
        path: PathBuf,
    },
}

impl WriterConfig {
    /// Transcript path, if records go to a file
    pub fn transcript_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Stderr => None,
            Self::File { path } | Self::Tee { path } => Some(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pretty", Format::Pretty)]
    #[case("COMPACT", Format::Compact)]
    #[case("Json", Format::Json)]
    fn test_format_parse(#[case] input: &str, #[case] expected: Format) {
        assert_eq!(input.parse::<Format>().unwrap(), expected);
    }

    #[test]
    fn test_format_parse_unknown() {
        assert!("logfmt".parse::<Format>().is_err());
    }

    #[test]
    fn test_transcript_path() {
        assert!(WriterConfig::Stderr.transcript_path().is_none());
        let tee = WriterConfig::Tee {
            path: PathBuf::from("run.log"),
        };
        assert_eq!(tee.transcript_path(), Some(&PathBuf::from("run.log")));
    }
}
