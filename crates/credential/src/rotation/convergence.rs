//! Store convergence watcher
//!
//! A store write only starts the platform's internal propagation of the new
//! secret. Downstream targets must not be handed the secret until the
//! platform's background job for it has drained.

use std::sync::Arc;
use std::time::Duration;

use keyshift_resilience::{PollOutcome, poll_until};

use super::config::ConvergenceConfig;
use crate::core::local_name;
use crate::platform::{BackgroundJob, JobMonitor, PlatformError};

/// How waiting for convergence ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceOutcome {
    /// No matching background job remains
    Converged {
        /// Job-listing polls made
        polls: u32,
    },
    /// Matching jobs were still present when the timeout elapsed
    TimedOut {
        /// Time spent polling
        waited: Duration,
    },
    /// The job listing itself failed
    Unobservable {
        /// Listing error
        reason: String,
    },
}

impl ConvergenceOutcome {
    /// Whether the platform confirmed convergence
    pub const fn is_converged(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Polls the platform's background jobs for a pending secret update
#[derive(Clone)]
pub struct ConvergenceWatcher {
    jobs: Arc<dyn JobMonitor>,
}

impl std::fmt::Debug for ConvergenceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvergenceWatcher").finish_non_exhaustive()
    }
}

impl ConvergenceWatcher {
    /// Create a watcher over a job listing
    pub fn new(jobs: Arc<dyn JobMonitor>) -> Self {
        Self { jobs }
    }

    /// Block until no job referencing `identity` and "password" remains, or
    /// the timeout elapses
    pub async fn await_convergence(
        &self,
        identity: &str,
        config: &ConvergenceConfig,
    ) -> ConvergenceOutcome {
        let jobs = self.jobs.as_ref();
        let polled = poll_until(&config.poll(), "store_convergence", || async move {
            let pending = jobs.list_jobs().await?;
            let matching = pending.iter().filter(|j| is_password_job(j, identity)).count();
            if matching > 0 {
                tracing::debug!(identity, matching, "Convergence pending");
            }
            Ok::<_, PlatformError>((matching == 0).then_some(()))
        })
        .await;

        match polled {
            Ok(PollOutcome::Ready { attempts, .. }) => {
                tracing::info!(identity, polls = attempts, "Store converged");
                ConvergenceOutcome::Converged { polls: attempts }
            }
            Ok(PollOutcome::TimedOut { elapsed, .. }) => {
                tracing::warn!(identity, waited_secs = elapsed.as_secs(), "Convergence timed out");
                ConvergenceOutcome::TimedOut { waited: elapsed }
            }
            Err(error) => {
                tracing::warn!(identity, error = %error, "Job listing failed while waiting for convergence");
                ConvergenceOutcome::Unobservable {
                    reason: error.to_string(),
                }
            }
        }
    }
}

/// Whether a job's description references the identity and a password change
fn is_password_job(job: &BackgroundJob, identity: &str) -> bool {
    let description = job.description.to_ascii_lowercase();
    let full = identity.to_ascii_lowercase();
    let local = local_name(identity).to_ascii_lowercase();
    description.contains("password") && (description.contains(&full) || description.contains(&local))
}
