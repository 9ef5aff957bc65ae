//! Error types for logger setup

use thiserror::Error;

/// Result type for logger operations
pub type LogResult<T> = Result<T, LogError>;

/// Errors raised while building the logger
#[derive(Debug, Error)]
pub enum LogError {
    /// The filter directive string could not be parsed
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// The transcript file could not be opened
    #[error("Failed to open transcript {path}: {source}")]
    Transcript {
        /// Path that was requested
        path: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}
