//! Configuration presets for common scenarios

use super::{Config, DisplayConfig, Format, WriterConfig};

impl Config {
    /// Create configuration from environment variables
    ///
    /// Reads `KEYSHIFT_LOG` (falling back to `RUST_LOG`) for the filter and
    /// `KEYSHIFT_LOG_FORMAT` for the format. Unknown formats keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("KEYSHIFT_LOG") {
            config.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            config.level = level;
        }

        if let Some(format) = std::env::var("KEYSHIFT_LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse::<Format>().ok())
        {
            config.format = format;
        }

        config
    }

    /// Development configuration (pretty, debug level)
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            display: DisplayConfig {
                colors: true,
                source: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production configuration (JSON, info level)
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            display: DisplayConfig {
                colors: false,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Also write every record to a transcript file
    #[must_use]
    pub fn with_transcript(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.writer = WriterConfig::Tee { path: path.into() };
        self
    }
}
