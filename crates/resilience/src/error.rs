//! Error types for resilience primitives

use std::time::Duration;

use thiserror::Error;

/// Result type for resilience operations
pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Errors raised while configuring a resilience primitive
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResilienceError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the value
        message: String,
    },

    /// The wait budget is shorter than the interval between probes
    #[error("Timeout {timeout:?} is shorter than poll interval {interval:?}")]
    TimeoutBelowInterval {
        /// Configured timeout
        timeout: Duration,
        /// Configured interval
        interval: Duration,
    },
}

impl ResilienceError {
    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
