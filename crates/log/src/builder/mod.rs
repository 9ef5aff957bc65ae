//! Logger builder implementation

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, MakeWriter, writer::BoxMakeWriter, writer::MakeWriterExt},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::{Config, Format, WriterConfig};
use crate::core::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard that keeps the logger's root span alive
///
/// Hold it for the lifetime of the process; dropping it exits the root span.
#[derive(Debug)]
pub struct LoggerGuard {
    #[allow(dead_code)]
    root_span: Option<tracing::span::EnteredSpan>,
}

/// Apply display toggles to a fmt layer and box it with its filter.
/// `without_time` changes the layer type, hence the macro.
macro_rules! boxed_fmt_layer {
    ($layer:expr, $display:expr, $ansi:expr, $writer:expr, $filter:expr) => {{
        let layer = $layer
            .with_ansi($ansi)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_writer($writer);
        if $display.time {
            layer.with_filter($filter).boxed()
        } else {
            layer.without_time().with_filter($filter).boxed()
        }
    }};
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Add a root span carrying a run identifier to every record
    #[must_use]
    pub fn run_id(self, run_id: impl Into<String>) -> LoggerBuilderWithRun {
        LoggerBuilderWithRun {
            inner: self,
            run_id: run_id.into(),
        }
    }

    /// Build and initialize the global logger
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - Transcript file cannot be opened
    /// - Another global subscriber is already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        self.install()?;
        Ok(LoggerGuard { root_span: None })
    }

    fn install(&self) -> LogResult<()> {
        let filter = EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {}", &self.config.level, e)))?;

        let writer = make_writer(&self.config.writer)?;
        // ANSI escapes are only useful when nothing goes to a transcript file.
        let ansi = self.config.display.colors && self.config.writer.transcript_path().is_none();
        let display = &self.config.display;

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match self.config.format {
            Format::Pretty => boxed_fmt_layer!(fmt::layer().pretty(), display, ansi, writer, filter),
            Format::Compact => {
                boxed_fmt_layer!(fmt::layer().compact(), display, ansi, writer, filter)
            }
            Format::Json => boxed_fmt_layer!(fmt::layer().json(), display, ansi, writer, filter),
        };

        Registry::default()
            .with(layer)
            .try_init()
            .map_err(|e| LogError::AlreadyInitialized(e.to_string()))
    }
}

/// Builder variant that enters a `run` root span after initialization
#[derive(Debug)]
pub struct LoggerBuilderWithRun {
    inner: LoggerBuilder,
    run_id: String,
}

impl LoggerBuilderWithRun {
    /// Build and initialize the global logger, entering the root span
    pub fn build(self) -> LogResult<LoggerGuard> {
        self.inner.install()?;
        let root = tracing::info_span!("run", run_id = %self.run_id);
        Ok(LoggerGuard {
            root_span: Some(root.entered()),
        })
    }
}

fn make_writer(config: &WriterConfig) -> LogResult<BoxMakeWriter> {
    Ok(match config {
        WriterConfig::Stderr => BoxMakeWriter::new(std::io::stderr),
        WriterConfig::File { path } => BoxMakeWriter::new(open_transcript(path)?),
        WriterConfig::Tee { path } => {
            BoxMakeWriter::new(std::io::stderr.and(open_transcript(path)?))
        }
    })
}

fn open_transcript(path: &Path) -> LogResult<impl for<'a> MakeWriter<'a> + Send + Sync + 'static> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::Transcript {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Mutex::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected_before_install() {
        let config = Config {
            level: "keyshift=notalevel".to_string(),
            ..Config::default()
        };
        let err = LoggerBuilder::from_config(config).build().unwrap_err();
        assert!(matches!(err, LogError::Filter(_)));
    }

    #[test]
    fn test_unwritable_transcript_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-dir").join("run.log");
        let err = make_writer(&WriterConfig::File { path: missing }).unwrap_err();
        assert!(matches!(err, LogError::Transcript { .. }));
    }
}
