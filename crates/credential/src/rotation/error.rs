//! Rotation-specific error types
//!
//! This module defines all errors that can occur during a rotation run.

use std::time::Duration;

use thiserror::Error;

use crate::platform::PlatformError;
use crate::propagation::PropagationTarget;

/// Errors that can occur during credential rotation
#[derive(Debug, Clone, Error)]
pub enum RotationError {
    /// Generator or orchestrator configuration is unusable; raised before any mutation
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    /// The identity filter matched no managed account
    #[error("Managed account not found: {identity}")]
    IdentityNotFound { identity: String },

    /// The authoritative store rejected the new secret
    #[error("Store write failed for {identity}: {source}")]
    StoreWrite {
        identity: String,
        #[source]
        source: PlatformError,
    },

    /// Store convergence did not finish in time (propagation still proceeds)
    #[error("Convergence for {identity} did not finish within {waited:?}")]
    ConvergenceTimeout { identity: String, waited: Duration },

    /// The background job listing failed, so convergence was never confirmed
    #[error("Convergence for {identity} could not be observed: {reason}")]
    ConvergenceUnobservable { identity: String, reason: String },

    /// A propagation target could not be reached
    #[error("Target {target} unreachable: {reason}")]
    TargetUnreachable {
        target: PropagationTarget,
        reason: String,
    },

    /// A propagation target does not exist
    #[error("Target {target} not found")]
    TargetNotFound { target: PropagationTarget },

    /// The operating system entropy source failed
    #[error("Secure random source unavailable: {0}")]
    Entropy(String),

    /// Job state machine misuse
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Platform adapter error outside of a propagation target
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

impl RotationError {
    /// Create a configuration error
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Whether this error stops the whole run
    ///
    /// Everything else is contained to one account or one target.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Entropy(_))
    }
}

/// Result type for rotation operations
pub type RotationResult<T> = Result<T, RotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_and_entropy_are_fatal() {
        assert!(RotationError::configuration("length 0").is_fatal());
        assert!(RotationError::Entropy("no device".into()).is_fatal());
        assert!(
            !RotationError::IdentityNotFound {
                identity: "x".into()
            }
            .is_fatal()
        );
        assert!(
            !RotationError::ConvergenceTimeout {
                identity: "x".into(),
                waited: Duration::from_secs(1),
            }
            .is_fatal()
        );
    }
}
