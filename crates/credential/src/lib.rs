//! Keyshift Credential - service account secret rotation
//!
//! Rotates the shared secret of every managed service account in a farm and
//! pushes the new value to every place it is cached or configured.
//!
//! # Pipeline
//!
//! For each account, in enumeration order:
//!
//! 1. Generate one secret ([`generator::PasswordGenerator`]).
//! 2. Write it to the authoritative [`platform::CredentialStore`].
//! 3. Wait for the store's background convergence
//!    ([`rotation::ConvergenceWatcher`]); the first account of a run repeats
//!    steps 2-3 as a warm-up.
//! 4. Classify the account ([`role::RoleClassifier`]) and run its role
//!    applier, then every universal applier ([`propagation`]).
//!
//! Propagation is best-effort: a failing host or resource is recorded on the
//! account's outcome and never stops sibling targets or later accounts.
#![forbid(unsafe_code)]

/// Core types: secrets and account identities
pub mod core;
/// Constraint-satisfying secret generation
pub mod generator;
/// Platform adapter boundary
pub mod platform;
/// Propagation of a rotated secret to role-specific and universal targets
pub mod propagation;
/// Platform implementations
pub mod providers;
/// Account role classification
pub mod role;
/// Rotation orchestration
pub mod rotation;

// ── Root re-exports ─────────────────────────────────────────────────────────

pub use crate::core::{Secret, identity_matches, local_name};
pub use crate::generator::{CharGroup, GeneratorConfig, OsRandom, PasswordGenerator, SecureRandom};
pub use crate::platform::{Platform, PlatformError, PlatformResult};
pub use crate::propagation::{ApplyReport, PropagationFailure, PropagationTarget, Subsystem};
pub use crate::role::{Role, RoleClassifier, RoleRule};
pub use crate::rotation::{
    AccountOutcome, JobState, Operation, RotationConfig, RotationError, RotationOrchestrator,
    RotationResult, RunReport, Scope,
};

/// Commonly used types and traits
pub mod prelude {
    pub use crate::core::Secret;
    pub use crate::generator::{GeneratorConfig, OsRandom, PasswordGenerator, SecureRandom};
    pub use crate::platform::{
        CredentialStore, DirectorySync, FleetTopology, HostAgent, JobMonitor, LoginProbe,
        Platform, PlatformError, PlatformResult, SearchAdmin, SecureStore, WorkflowAdmin,
    };
    pub use crate::providers::{Inventory, MemoryPlatform, Mutation};
    pub use crate::role::{Role, RoleClassifier};
    pub use crate::rotation::{
        AccountOutcome, JobState, Operation, RotationConfig, RotationError, RotationOrchestrator,
        RotationResult, RunReport, Scope,
    };
}
