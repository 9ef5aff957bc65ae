//! Propagation of a rotated secret
//!
//! After the store has the new secret, role appliers push it into the
//! subsystem the account serves and universal appliers push it into every
//! host-local resource that runs as the account. Failures are contained at
//! the smallest scope (one host, one resource) and collected in an
//! [`ApplyReport`]; they never stop sibling targets.

mod role;
mod start_wait;
mod universal;

pub use role::RoleAppliers;
pub use start_wait::start_and_wait;
pub use universal::UniversalAppliers;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::PlatformError;
use crate::rotation::RotationError;

/// Kind of resource receiving a secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subsystem {
    /// Fleet host listing
    Topology,
    /// OS service logon
    OsService,
    /// Scheduled task run-as credential
    ScheduledTask,
    /// Web-server worker pool identity
    WorkerPool,
    /// Directory-sync service binding
    DirectorySync,
    /// Search service run-as account
    SearchService,
    /// Crawler content-access account
    CrawlAccount,
    /// Workflow backend run-as account
    Workflow,
    /// Secure-store unattended account
    SecureStore,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Topology => "topology",
            Self::OsService => "os-service",
            Self::ScheduledTask => "scheduled-task",
            Self::WorkerPool => "worker-pool",
            Self::DirectorySync => "directory-sync",
            Self::SearchService => "search-service",
            Self::CrawlAccount => "crawl-account",
            Self::Workflow => "workflow",
            Self::SecureStore => "secure-store",
        };
        f.write_str(label)
    }
}

/// A place a secret is pushed to: (host, subsystem, resource)
///
/// Farm-wide configuration has no host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropagationTarget {
    /// Host holding the resource
    pub host: Option<String>,
    /// Resource kind
    pub subsystem: Subsystem,
    /// Resource name
    pub resource: String,
}

impl PropagationTarget {
    /// Target on a specific host
    pub fn on_host(host: impl Into<String>, subsystem: Subsystem, resource: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            subsystem,
            resource: resource.into(),
        }
    }

    /// Farm-wide target
    pub fn farm(subsystem: Subsystem, resource: impl Into<String>) -> Self {
        Self {
            host: None,
            subsystem,
            resource: resource.into(),
        }
    }
}

impl fmt::Display for PropagationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.host.as_deref().unwrap_or("farm"),
            self.subsystem,
            self.resource
        )
    }
}

/// A target that did not receive the secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationFailure {
    /// Where the push failed
    pub target: PropagationTarget,
    /// Adapter error
    pub error: PlatformError,
}

impl PropagationFailure {
    /// Classify as a rotation error
    pub fn to_error(&self) -> RotationError {
        match &self.error {
            PlatformError::NotFound { .. } => RotationError::TargetNotFound {
                target: self.target.clone(),
            },
            other => RotationError::TargetUnreachable {
                target: self.target.clone(),
                reason: other.to_string(),
            },
        }
    }
}

/// Targets updated and failed by one or more appliers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Targets that received the secret
    pub updated: Vec<PropagationTarget>,
    /// Targets that did not
    pub failures: Vec<PropagationFailure>,
}

impl ApplyReport {
    /// Record the result of one push
    pub fn record(&mut self, target: PropagationTarget, result: Result<(), PlatformError>) {
        match result {
            Ok(()) => {
                tracing::info!(destination = %target, "Secret propagated");
                self.updated.push(target);
            }
            Err(error) => self.fail(target, error),
        }
    }

    /// Record a failed push or lookup
    pub fn fail(&mut self, target: PropagationTarget, error: PlatformError) {
        tracing::warn!(destination = %target, error = %error, "Propagation failed, skipping");
        self.failures.push(PropagationFailure { target, error });
    }

    /// Append another report
    pub fn merge(&mut self, other: Self) {
        self.updated.extend(other.updated);
        self.failures.extend(other.failures);
    }

    /// Whether every push succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
