//! Errors reported by platform adapters

use thiserror::Error;

/// Result type for platform adapter calls
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors reported by platform adapters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The host could not be contacted
    #[error("host {host} unreachable: {reason}")]
    Unreachable { host: String, reason: String },

    /// The named resource does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// The platform refused the operation
    #[error("{operation} rejected: {reason}")]
    Rejected { operation: String, reason: String },

    /// The subsystem is not available in this farm
    #[error("subsystem unavailable: {reason}")]
    Unavailable { reason: String },
}

impl PlatformError {
    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a rejection error
    pub fn rejected(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an unreachable-host error
    pub fn unreachable(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            host: host.into(),
            reason: reason.into(),
        }
    }
}
