//! Rotation orchestrator
//!
//! Drives every other component. No component calls back into it.

use parking_lot::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use super::config::RotationConfig;
use super::convergence::ConvergenceWatcher;
use super::error::{RotationError, RotationResult};
use super::job::{AccountOutcome, JobState, RotationJob};
use super::lock::RotationLocks;
use super::report::{AccountCheck, RunReport, Scope, ScopedChecks};
use crate::core::{Secret, identity_matches};
use crate::generator::{OsRandom, PasswordGenerator, SecureRandom};
use crate::platform::{Platform, SyncInstance};
use crate::propagation::{RoleAppliers, UniversalAppliers};
use crate::role::RoleClassifier;

/// Sequences secret rotation and propagation for managed accounts
pub struct RotationOrchestrator {
    platform: Platform,
    config: RotationConfig,
    generator: PasswordGenerator,
    random: Mutex<Box<dyn SecureRandom>>,
    classifier: RoleClassifier,
    watcher: ConvergenceWatcher,
    role_appliers: RoleAppliers,
    universal: UniversalAppliers,
    locks: RotationLocks,
}

impl std::fmt::Debug for RotationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RotationOrchestrator {
    /// Create an orchestrator drawing from the OS CSPRNG
    ///
    /// # Errors
    ///
    /// Returns `Configuration` when any section of `config` is unusable.
    /// Nothing has been mutated at that point.
    pub fn new(platform: Platform, config: RotationConfig) -> RotationResult<Self> {
        config.validate()?;
        let generator = PasswordGenerator::new(&config.generator)?;
        let classifier = RoleClassifier::new(config.roles.rules.clone());
        let watcher = ConvergenceWatcher::new(platform.jobs.clone());
        let role_appliers =
            RoleAppliers::new(platform.clone(), config.roles.clone(), config.start_wait);
        let universal = UniversalAppliers::new(platform.clone());

        Ok(Self {
            platform,
            config,
            generator,
            random: Mutex::new(Box::new(OsRandom)),
            classifier,
            watcher,
            role_appliers,
            universal,
            locks: RotationLocks::new(),
        })
    }

    /// Replace the random source
    #[must_use]
    pub fn with_random(mut self, random: impl SecureRandom + 'static) -> Self {
        self.random = Mutex::new(Box::new(random));
        self
    }

    /// Active configuration
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    /// Per-identity rotation locks
    pub fn locks(&self) -> &RotationLocks {
        &self.locks
    }

    /// Rotate (or, with `propagate_only`, re-push) every account in `scope`
    ///
    /// # Errors
    ///
    /// Only failures that make the whole run meaningless are returned: the
    /// account listing is unavailable or the entropy source failed. Per-account
    /// and per-target failures are recorded on the report.
    pub async fn rotate(&self, scope: &Scope, propagate_only: bool) -> RotationResult<RunReport> {
        let run_id = Uuid::new_v4();
        let mut report = RunReport::start(run_id, scope.clone(), propagate_only);

        let Some(accounts) = self.resolve(scope).await? else {
            tracing::warn!(%run_id, scope = %scope, "No managed account matches the filter");
            report.not_found = true;
            return Ok(report.finish());
        };

        let total = accounts.len();
        tracing::info!(%run_id, total, propagate_only, "Rotation run started");

        for (index, identity) in accounts.iter().enumerate() {
            let position = index + 1;
            let span = tracing::info_span!("account", identity = %identity, position, total);
            let outcome = self
                .rotate_account(identity, position, propagate_only)
                .instrument(span)
                .await?;
            report.push(outcome);
        }

        let report = report.finish();
        tracing::info!(
            %run_id,
            processed = report.processed,
            done = report.count(JobState::Done),
            partially_failed = report.count(JobState::PartiallyFailed),
            failed = report.count(JobState::Failed),
            "Rotation run finished"
        );
        Ok(report)
    }

    /// Accounts in scope, enumerated fresh; `None` when a filter matched nothing
    async fn resolve(&self, scope: &Scope) -> RotationResult<Option<Vec<String>>> {
        let accounts = self.platform.store.list_accounts().await?;
        match scope {
            Scope::All => Ok(Some(accounts)),
            Scope::Identity(filter) => {
                let matched: Vec<String> = accounts
                    .into_iter()
                    .filter(|a| identity_matches(a, filter))
                    .collect();
                Ok((!matched.is_empty()).then_some(matched))
            }
        }
    }

    async fn rotate_account(
        &self,
        identity: &str,
        position: usize,
        propagate_only: bool,
    ) -> RotationResult<AccountOutcome> {
        let _guard = self.locks.acquire(identity).await;
        tracing::info!("Processing account");
        let mut job = RotationJob::new(identity, position);

        let secret = if propagate_only {
            match self.platform.store.read(identity).await {
                Ok(secret) => {
                    job.transition(JobState::Propagating)?;
                    secret
                }
                Err(error) => return job.fail(RotationError::Platform(error)),
            }
        } else {
            let secret = self.generate()?;
            let cycles = self.config.warmup.cycles_for(position);
            for cycle in 1..=cycles {
                job.transition(JobState::Applying)?;
                if let Err(source) = self.platform.store.write(identity, &secret).await {
                    return job.fail(RotationError::StoreWrite {
                        identity: identity.to_string(),
                        source,
                    });
                }
                job.record_write();
                tracing::info!(cycle, cycles, "Secret written to store");

                job.transition(JobState::Converging)?;
                let outcome = self
                    .watcher
                    .await_convergence(identity, &self.config.convergence)
                    .await;
                job.record_convergence(outcome);

                if cycle < cycles {
                    job.transition(JobState::Retry(cycle))?;
                    tracing::info!(
                        cycle,
                        pause_secs = self.config.warmup.pause.as_secs(),
                        "Warm-up pause before repeating the store write"
                    );
                    tokio::time::sleep(self.config.warmup.pause).await;
                }
            }
            job.transition(JobState::Propagating)?;
            secret
        };

        let role = self.classifier.classify(identity);
        job.set_role(role);
        tracing::info!(role = %role, "Propagating secret");
        job.record_propagation(self.role_appliers.apply(role, identity, &secret).await);
        job.record_propagation(self.universal.apply_all(identity, &secret).await);

        let outcome = job.finish()?;
        tracing::info!(
            state = %outcome.state,
            updated = outcome.updated.len(),
            failures = outcome.failures.len(),
            "Account finished"
        );
        Ok(outcome)
    }

    fn generate(&self) -> RotationResult<Secret> {
        let mut random = self.random.lock();
        self.generator.generate(&mut **random)
    }

    /// Stored secret of every account in scope
    pub async fn display_secrets(&self, scope: &Scope) -> RotationResult<ScopedChecks<Secret>> {
        self.check_each(scope, |identity| async move {
            self.platform.store.read(&identity).await
        })
        .await
    }

    /// Whether each account in scope can log in with its stored secret
    pub async fn probe_logins(&self, scope: &Scope) -> RotationResult<ScopedChecks<bool>> {
        self.check_each(scope, |identity| async move {
            let secret = self.platform.store.read(&identity).await?;
            let passed = self.platform.login.probe(&identity, &secret).await?;
            if passed {
                tracing::info!(identity = %identity, "Login probe passed");
            } else {
                tracing::warn!(identity = %identity, "Login probe failed");
            }
            Ok(passed)
        })
        .await
    }

    /// Re-deploy the stored secret of every account in scope
    pub async fn repair_deployment(&self, scope: &Scope) -> RotationResult<ScopedChecks<()>> {
        self.check_each(scope, |identity| async move {
            let _guard = self.locks.acquire(&identity).await;
            tracing::info!(identity = %identity, "Repairing credential deployment");
            self.platform.store.repair_deployment(&identity).await
        })
        .await
    }

    /// Directory-sync instances and their status
    pub async fn directory_status(&self) -> RotationResult<Vec<SyncInstance>> {
        Ok(self.platform.sync.instances().await?)
    }

    async fn check_each<T, F, Fut>(&self, scope: &Scope, mut check: F) -> RotationResult<ScopedChecks<T>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = crate::platform::PlatformResult<T>>,
    {
        let Some(accounts) = self.resolve(scope).await? else {
            tracing::warn!(scope = %scope, "No managed account matches the filter");
            return Ok(ScopedChecks {
                not_found: true,
                checks: Vec::new(),
            });
        };

        let mut checks = Vec::with_capacity(accounts.len());
        for identity in accounts {
            let result = check(identity.clone()).await;
            if let Err(error) = &result {
                tracing::warn!(identity = %identity, error = %error, "Account check failed");
            }
            checks.push(AccountCheck { identity, result });
        }
        Ok(ScopedChecks {
            not_found: false,
            checks,
        })
    }
}
