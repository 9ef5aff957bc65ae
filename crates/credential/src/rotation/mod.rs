//! Rotation orchestration
//!
//! [`RotationOrchestrator`] sequences one rotation per managed account:
//! store write, convergence wait (repeated for the warm-up account), role
//! dispatch, universal propagation. Accounts are processed strictly one after
//! another; failures are recorded on each [`AccountOutcome`] and never abort
//! the batch.

pub mod config;
mod convergence;
mod error;
mod job;
mod lock;
mod operation;
mod orchestrator;
mod report;

pub use config::{
    ConvergenceConfig, RoleConfig, RotationConfig, StartWaitConfig, UnattendedAccount,
    UnattendedConfig, WarmupConfig, WarmupPolicy, WorkflowHosts,
};
pub use convergence::{ConvergenceOutcome, ConvergenceWatcher};
pub use error::{RotationError, RotationResult};
pub use job::{AccountOutcome, JobState};
pub use lock::{RotationGuard, RotationLocks};
pub use operation::Operation;
pub use orchestrator::RotationOrchestrator;
pub use report::{AccountCheck, RunReport, Scope, ScopedChecks};
