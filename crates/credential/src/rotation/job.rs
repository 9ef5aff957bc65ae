//! Per-account rotation state machine
//!
//! ```text
//! Pending → Applying → Converging ─┬→ Retry(n) → Applying …
//!    │                              └→ Propagating → Done | PartiallyFailed
//!    └──────────────(push only)──────→ Propagating
//! Pending | Applying → Failed
//! ```
//!
//! A job exists only while one account is processed; nothing is persisted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::convergence::ConvergenceOutcome;
use super::error::{RotationError, RotationResult};
use crate::propagation::{ApplyReport, PropagationFailure, PropagationTarget};
use crate::role::Role;

/// State of one account's rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "state", content = "cycle")]
pub enum JobState {
    /// Not started
    Pending,
    /// Writing the secret to the store
    Applying,
    /// Waiting for store convergence
    Converging,
    /// Between warm-up cycles; holds the completed cycle number
    Retry(u32),
    /// Pushing the secret to targets
    Propagating,
    /// Every target updated
    Done,
    /// Some targets did not receive the secret
    PartiallyFailed,
    /// The store rejected the secret; nothing was propagated
    Failed,
}

impl JobState {
    /// Whether the job has finished
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::PartiallyFailed | Self::Failed)
    }

    /// Whether `next` is a legal successor of this state
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Applying | Self::Propagating | Self::Failed)
                | (Self::Applying, Self::Converging | Self::Failed)
                | (Self::Converging, Self::Retry(_) | Self::Propagating)
                | (Self::Retry(_), Self::Applying)
                | (Self::Propagating, Self::Done | Self::PartiallyFailed)
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Applying => write!(f, "applying"),
            Self::Converging => write!(f, "converging"),
            Self::Retry(n) => write!(f, "retry({n})"),
            Self::Propagating => write!(f, "propagating"),
            Self::Done => write!(f, "done"),
            Self::PartiallyFailed => write!(f, "partially-failed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Ephemeral state of one account's rotation
#[derive(Debug)]
pub(crate) struct RotationJob {
    identity: String,
    position: usize,
    state: JobState,
    started_at: DateTime<Utc>,
    role: Option<Role>,
    store_writes: u32,
    convergence: Vec<ConvergenceOutcome>,
    report: ApplyReport,
    error: Option<RotationError>,
}

impl RotationJob {
    pub(crate) fn new(identity: impl Into<String>, position: usize) -> Self {
        Self {
            identity: identity.into(),
            position,
            state: JobState::Pending,
            started_at: Utc::now(),
            role: None,
            store_writes: 0,
            convergence: Vec::new(),
            report: ApplyReport::default(),
            error: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> JobState {
        self.state
    }

    pub(crate) fn transition(&mut self, next: JobState) -> RotationResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(RotationError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(identity = %self.identity, from = %self.state, to = %next, "Job transition");
        self.state = next;
        Ok(())
    }

    pub(crate) fn record_write(&mut self) {
        self.store_writes += 1;
    }

    pub(crate) fn record_convergence(&mut self, outcome: ConvergenceOutcome) {
        self.convergence.push(outcome);
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    pub(crate) fn record_propagation(&mut self, report: ApplyReport) {
        self.report.merge(report);
    }

    /// Fail the job before propagation
    pub(crate) fn fail(mut self, error: RotationError) -> RotationResult<AccountOutcome> {
        tracing::error!(identity = %self.identity, error = %error, "Rotation failed for account");
        self.transition(JobState::Failed)?;
        self.error = Some(error);
        Ok(self.into_outcome())
    }

    /// Finish propagation and settle on `Done` or `PartiallyFailed`
    pub(crate) fn finish(mut self) -> RotationResult<AccountOutcome> {
        let terminal = if self.report.is_clean() {
            JobState::Done
        } else {
            JobState::PartiallyFailed
        };
        self.transition(terminal)?;
        Ok(self.into_outcome())
    }

    fn into_outcome(self) -> AccountOutcome {
        AccountOutcome {
            identity: self.identity,
            position: self.position,
            role: self.role,
            state: self.state,
            store_writes: self.store_writes,
            convergence: self.convergence,
            updated: self.report.updated,
            failures: self.report.failures,
            error: self.error,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Final result of one account's rotation
#[derive(Debug, Clone)]
pub struct AccountOutcome {
    /// Rotated identity
    pub identity: String,
    /// 1-based processing position in the run
    pub position: usize,
    /// Role, once classified
    pub role: Option<Role>,
    /// Terminal state
    pub state: JobState,
    /// Store writes performed (one per write/converge cycle)
    pub store_writes: u32,
    /// Convergence result of each cycle
    pub convergence: Vec<ConvergenceOutcome>,
    /// Targets that received the secret
    pub updated: Vec<PropagationTarget>,
    /// Targets that did not
    pub failures: Vec<PropagationFailure>,
    /// Account-level error (store write rejected)
    pub error: Option<RotationError>,
    /// When processing started
    pub started_at: DateTime<Utc>,
    /// When processing finished
    pub finished_at: DateTime<Utc>,
}

impl AccountOutcome {
    /// Whether every store write of this account was confirmed converged
    ///
    /// Trivially true for push-only runs, which write nothing.
    pub fn is_converged(&self) -> bool {
        self.convergence.iter().all(ConvergenceOutcome::is_converged)
    }

    /// Every non-fatal error recorded for this account, including
    /// unconfirmed convergence
    pub fn errors(&self) -> Vec<RotationError> {
        let mut errors: Vec<RotationError> = self.error.iter().cloned().collect();
        errors.extend(self.convergence.iter().filter_map(|c| match c {
            ConvergenceOutcome::Converged { .. } => None,
            ConvergenceOutcome::TimedOut { waited } => Some(RotationError::ConvergenceTimeout {
                identity: self.identity.clone(),
                waited: *waited,
            }),
            ConvergenceOutcome::Unobservable { reason } => {
                Some(RotationError::ConvergenceUnobservable {
                    identity: self.identity.clone(),
                    reason: reason.clone(),
                })
            }
        }));
        errors.extend(self.failures.iter().map(PropagationFailure::to_error));
        errors
    }
}
