//! Run scope and run reports

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::RotationError;
use super::job::{AccountOutcome, JobState};
use crate::platform::PlatformResult;
use crate::propagation::PropagationFailure;

/// Which managed accounts a run touches
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// Every managed account, in enumeration order
    #[default]
    All,
    /// The single account whose identity matches case-insensitively
    Identity(String),
}

impl Scope {
    /// Scope from an optional identity filter; blank filters mean all accounts
    pub fn from_filter(filter: Option<&str>) -> Self {
        match filter.map(str::trim) {
            Some(identity) if !identity.is_empty() => Self::Identity(identity.to_string()),
            _ => Self::All,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all accounts"),
            Self::Identity(identity) => f.write_str(identity),
        }
    }
}

/// Result of one `rotate` call
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Correlates the run's log lines
    pub run_id: Uuid,
    /// Requested scope
    pub scope: Scope,
    /// Whether the store step was skipped
    pub propagate_only: bool,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Accounts processed
    pub processed: usize,
    /// The identity filter matched nothing; no mutation was made
    pub not_found: bool,
    /// One entry per processed account, in processing order
    pub outcomes: Vec<AccountOutcome>,
}

impl RunReport {
    pub(crate) fn start(run_id: Uuid, scope: Scope, propagate_only: bool) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            scope,
            propagate_only,
            started_at: now,
            finished_at: now,
            processed: 0,
            not_found: false,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, outcome: AccountOutcome) {
        self.processed += 1;
        self.outcomes.push(outcome);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// Every target that did not receive its secret, for a targeted retry
    pub fn failed_targets(&self) -> impl Iterator<Item = (&str, &PropagationFailure)> {
        self.outcomes
            .iter()
            .flat_map(|o| o.failures.iter().map(move |f| (o.identity.as_str(), f)))
    }

    /// Every non-fatal error recorded during the run, starting with an
    /// unmatched identity filter
    pub fn errors(&self) -> Vec<RotationError> {
        let mut errors = Vec::new();
        if let (true, Scope::Identity(identity)) = (self.not_found, &self.scope) {
            errors.push(RotationError::IdentityNotFound {
                identity: identity.clone(),
            });
        }
        errors.extend(self.outcomes.iter().flat_map(AccountOutcome::errors));
        errors
    }

    /// Number of outcomes in `state`
    pub fn count(&self, state: JobState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    /// Accounts with at least one store write whose convergence was not
    /// confirmed (timed out or unobservable)
    pub fn unconverged(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_converged()).count()
    }

    /// Whether every processed account reached `Done` with confirmed convergence
    pub fn is_clean(&self) -> bool {
        !self.not_found
            && self
                .outcomes
                .iter()
                .all(|o| o.state == JobState::Done && o.is_converged())
    }
}

/// Per-account result of a read-only or repair operation
#[derive(Debug, Clone)]
pub struct AccountCheck<T> {
    /// Account identity
    pub identity: String,
    /// Adapter result for this account
    pub result: PlatformResult<T>,
}

/// Per-account results of an operation over a scope
#[derive(Debug, Clone)]
pub struct ScopedChecks<T> {
    /// The identity filter matched nothing
    pub not_found: bool,
    /// One entry per account in scope
    pub checks: Vec<AccountCheck<T>>,
}

impl<T> ScopedChecks<T> {
    /// Number of accounts whose adapter call failed
    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|c| c.result.is_err()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, Scope::All)]
    #[case(Some(""), Scope::All)]
    #[case(Some("   "), Scope::All)]
    #[case(Some(" CONTOSO\\svc_a "), Scope::Identity("CONTOSO\\svc_a".to_string()))]
    fn test_scope_from_filter(#[case] filter: Option<&str>, #[case] expected: Scope) {
        assert_eq!(Scope::from_filter(filter), expected);
    }

    #[test]
    fn test_empty_report_is_clean() {
        let report = RunReport::start(Uuid::new_v4(), Scope::All, false).finish();
        assert!(report.is_clean());
        assert_eq!(report.failed_targets().count(), 0);
    }

    #[test]
    fn test_not_found_is_not_clean() {
        let mut report = RunReport::start(Uuid::new_v4(), Scope::Identity("x".into()), false);
        report.not_found = true;
        assert!(!report.is_clean());
        assert!(matches!(
            report.errors().as_slice(),
            [RotationError::IdentityNotFound { identity }] if identity == "x"
        ));
    }
}
