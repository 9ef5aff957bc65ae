//! Role-independent appliers
//!
//! Run for every rotated or re-pushed account, on every valid host:
//! scheduled tasks, worker pools, and OS service logons that run as the
//! account. The host list is re-queried by each applier.

use crate::core::{Secret, identity_matches};
use crate::platform::{Host, Platform};

use super::{ApplyReport, PropagationTarget, Subsystem};

/// Universal appliers
#[derive(Debug, Clone)]
pub struct UniversalAppliers {
    platform: Platform,
}

impl UniversalAppliers {
    /// Create the universal appliers
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    /// Run every universal applier in order
    pub async fn apply_all(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = self.scheduled_tasks(identity, secret).await;
        report.merge(self.worker_pools(identity, secret).await);
        report.merge(self.process_identities(identity, secret).await);
        report
    }

    async fn hosts(&self, report: &mut ApplyReport) -> Vec<Host> {
        match self.platform.valid_hosts().await {
            Ok(hosts) => hosts,
            Err(error) => {
                report.fail(PropagationTarget::farm(Subsystem::Topology, "hosts"), error);
                Vec::new()
            }
        }
    }

    /// Update the stored password of every task running as `identity`
    pub async fn scheduled_tasks(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        for host in self.hosts(&mut report).await {
            let tasks = match self.platform.hosts.scheduled_tasks(&host.name).await {
                Ok(tasks) => tasks,
                Err(error) => {
                    report.fail(
                        PropagationTarget::on_host(&host.name, Subsystem::ScheduledTask, "*"),
                        error,
                    );
                    continue;
                }
            };
            for task in tasks.iter().filter(|t| identity_matches(&t.run_as, identity)) {
                report.record(
                    PropagationTarget::on_host(&host.name, Subsystem::ScheduledTask, &task.name),
                    self.platform
                        .hosts
                        .set_task_credential(&host.name, &task.name, identity, secret)
                        .await,
                );
            }
        }
        report
    }

    /// Rewrite every pool running as `identity` whose stored secret is stale,
    /// then start and recycle it
    ///
    /// Pools already holding the new secret are left untouched. Start and
    /// recycle are best-effort and only logged.
    pub async fn worker_pools(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        for host in self.hosts(&mut report).await {
            let pools = match self.platform.hosts.worker_pools(&host.name).await {
                Ok(pools) => pools,
                Err(error) => {
                    report.fail(
                        PropagationTarget::on_host(&host.name, Subsystem::WorkerPool, "*"),
                        error,
                    );
                    continue;
                }
            };

            for pool in &pools {
                if !identity_matches(&pool.identity, identity) {
                    continue;
                }
                if pool.secret.as_ref() == Some(secret) {
                    tracing::debug!(host = %host.name, pool = %pool.name, "Pool already current");
                    continue;
                }

                let target = PropagationTarget::on_host(&host.name, Subsystem::WorkerPool, &pool.name);
                let written = self
                    .platform
                    .hosts
                    .set_pool_identity(&host.name, &pool.name, identity, secret)
                    .await;
                let ok = written.is_ok();
                report.record(target, written);
                if !ok {
                    continue;
                }

                if let Err(e) = self.platform.hosts.start_pool(&host.name, &pool.name).await {
                    tracing::warn!(host = %host.name, pool = %pool.name, error = %e, "Pool start failed");
                }
                if let Err(e) = self.platform.hosts.recycle_pool(&host.name, &pool.name).await {
                    tracing::warn!(host = %host.name, pool = %pool.name, error = %e, "Pool recycle failed");
                }
            }
        }
        report
    }

    /// Update the logon of every OS service running as `identity`
    pub async fn process_identities(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        for host in self.hosts(&mut report).await {
            let services = match self.platform.hosts.services(&host.name).await {
                Ok(services) => services,
                Err(error) => {
                    report.fail(
                        PropagationTarget::on_host(&host.name, Subsystem::OsService, "*"),
                        error,
                    );
                    continue;
                }
            };
            for service in services.iter().filter(|s| identity_matches(&s.logon, identity)) {
                report.record(
                    PropagationTarget::on_host(&host.name, Subsystem::OsService, &service.name),
                    self.platform
                        .hosts
                        .set_service_logon(&host.name, &service.name, identity, secret)
                        .await,
                );
            }
        }
        report
    }
}
