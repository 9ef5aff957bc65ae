//! Keyshift Log - structured logging and run transcripts
//!
//! Thin configuration layer over `tracing-subscriber`. Every keyshift crate
//! logs through plain `tracing` macros; binaries call [`init`] (or
//! [`LoggerBuilder`]) once at startup.
//!
//! ```rust,ignore
//! let _guard = keyshift_log::init(keyshift_log::Config::from_env())?;
//! tracing::info!(identity = "CONTOSO\\svc_search", "Rotating");
//! ```
#![forbid(unsafe_code)]

mod builder;
mod config;
mod core;

pub use builder::{LoggerBuilder, LoggerBuilderWithRun, LoggerGuard};
pub use config::{Config, DisplayConfig, Format, WriterConfig};
pub use crate::core::{LogError, LogResult};

/// Initialize the global logger from a configuration
pub fn init(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
