//! Role-specific appliers
//!
//! One handler per [`Role`]; `Role::Default` has none.

use crate::core::Secret;
use crate::platform::{Platform, PlatformError, WorkflowComponent};
use crate::role::Role;
use crate::rotation::config::{RoleConfig, StartWaitConfig, UnattendedAccount};

use super::start_wait::start_and_wait;
use super::{ApplyReport, PropagationTarget, Subsystem};

/// Dispatches a rotated secret to the subsystem its role serves
#[derive(Debug, Clone)]
pub struct RoleAppliers {
    platform: Platform,
    roles: RoleConfig,
    start_wait: StartWaitConfig,
}

impl RoleAppliers {
    /// Create the role appliers
    pub fn new(platform: Platform, roles: RoleConfig, start_wait: StartWaitConfig) -> Self {
        Self {
            platform,
            roles,
            start_wait,
        }
    }

    /// Run the applier for `role`
    pub async fn apply(&self, role: Role, identity: &str, secret: &Secret) -> ApplyReport {
        tracing::info!(identity, role = %role, "Applying role-specific propagation");
        match role {
            Role::Default => ApplyReport::default(),
            Role::FarmProfileSync => self.profile_sync(identity, secret).await,
            Role::Search => self.search(identity, secret).await,
            Role::ContentCrawl => self.content_crawl(identity, secret).await,
            Role::Sophos => {
                self.named_services(&self.roles.sophos_services, identity, secret)
                    .await
            }
            Role::WindowsService => {
                self.named_services(&self.roles.windows_services, identity, secret)
                    .await
            }
            Role::Workflow => self.workflow(identity, secret).await,
            Role::Excel => {
                self.unattended(&self.roles.unattended.excel, identity, secret)
                    .await
            }
            Role::Visio => {
                self.unattended(&self.roles.unattended.visio, identity, secret)
                    .await
            }
            Role::PerformancePoint => {
                self.unattended(&self.roles.unattended.performance_point, identity, secret)
                    .await
            }
        }
    }

    /// Rebind the directory-sync service on its running host, then make sure
    /// the instance comes back online
    async fn profile_sync(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        let sync = self.platform.sync.as_ref();

        let host = match self.sync_host(&mut report).await {
            Ok(host) => host,
            Err(error) => {
                report.fail(PropagationTarget::farm(Subsystem::DirectorySync, "instance"), error);
                return report;
            }
        };

        let binding = PropagationTarget::on_host(&host, Subsystem::DirectorySync, "service-account");
        if let Err(error) = sync.bind_account(&host, identity, secret).await {
            report.fail(binding, error);
            return report;
        }
        report.record(binding, sync.provision(&host).await);

        let instance = PropagationTarget::on_host(&host, Subsystem::DirectorySync, "instance");
        match start_and_wait(sync, &host, &self.start_wait).await {
            Ok(true) => {}
            Ok(false) => report.fail(
                instance,
                PlatformError::rejected("start sync instance", "did not come online before timeout"),
            ),
            Err(error) => report.fail(instance, error),
        }
        report
    }

    /// Host running the sync instance: an online one if any, else the admin host
    ///
    /// A failed instance listing is recorded on `report` and treated as "none
    /// online".
    async fn sync_host(&self, report: &mut ApplyReport) -> Result<String, PlatformError> {
        let instances = match self.platform.sync.instances().await {
            Ok(instances) => instances,
            Err(error) => {
                tracing::warn!(error = %error, "Sync instance listing failed");
                report.fail(PropagationTarget::farm(Subsystem::DirectorySync, "instances"), error);
                Vec::new()
            }
        };
        if let Some(online) = instances
            .iter()
            .find(|i| i.status == crate::platform::InstanceStatus::Online)
        {
            return Ok(online.host.clone());
        }
        tracing::debug!("No online sync instance, falling back to the admin host");
        self.platform.sync.admin_host().await
    }

    async fn search(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        report.record(
            PropagationTarget::farm(Subsystem::SearchService, "run-as"),
            self.platform.search.set_service_account(identity, secret).await,
        );
        report
    }

    async fn content_crawl(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        report.record(
            PropagationTarget::farm(Subsystem::CrawlAccount, "default-content-access"),
            self.platform
                .search
                .set_content_access_account(identity, secret)
                .await,
        );
        report
    }

    /// Update the logon of each listed service on every host where it exists
    async fn named_services(&self, names: &[String], identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        let hosts = match self.platform.valid_hosts().await {
            Ok(hosts) => hosts,
            Err(error) => {
                report.fail(PropagationTarget::farm(Subsystem::Topology, "hosts"), error);
                return report;
            }
        };

        for host in hosts {
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
            for name in names {
                if !services.iter().any(|s| s.name.eq_ignore_ascii_case(name)) {
                    tracing::debug!(host = %host.name, service = %name, "Service not installed");
                    continue;
                }
                report.record(
                    PropagationTarget::on_host(&host.name, Subsystem::OsService, name),
                    self.platform
                        .hosts
                        .set_service_logon(&host.name, name, identity, secret)
                        .await,
                );
            }
        }
        report
    }

    async fn workflow(&self, identity: &str, secret: &Secret) -> ApplyReport {
        let mut report = ApplyReport::default();
        let hosts = [
            (WorkflowComponent::ServiceBus, &self.roles.workflow.bus_host),
            (WorkflowComponent::WorkflowEngine, &self.roles.workflow.engine_host),
        ];
        for (component, host) in hosts {
            let Some(host) = host else {
                report.fail(
                    PropagationTarget::farm(Subsystem::Workflow, component.to_string()),
                    PlatformError::Unavailable {
                        reason: format!("no {component} host configured"),
                    },
                );
                continue;
            };
            report.record(
                PropagationTarget::on_host(host, Subsystem::Workflow, component.to_string()),
                self.platform
                    .workflow
                    .set_run_as(host, component, identity, secret)
                    .await,
            );
        }
        report
    }

    /// Create or reuse the secure-store target, write the credential into it,
    /// and bind the service application's unattended account to it
    async fn unattended(
        &self,
        account: &UnattendedAccount,
        identity: &str,
        secret: &Secret,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        let store = self.platform.secure_store.as_ref();
        let app = account.service_application.as_str();
        let target = PropagationTarget::farm(Subsystem::SecureStore, &account.target.application_id);

        let steps = async {
            let created = store.ensure_target(app, &account.target).await?;
            if created {
                tracing::info!(application_id = %account.target.application_id, "Created secure-store target");
            }
            store.set_permissions(app, &account.target).await?;
            store
                .set_credentials(app, &account.target.application_id, identity, secret)
                .await?;
            store
                .bind_unattended_account(app, &account.target.application_id)
                .await
        };
        report.record(target, steps.await);
        report
    }
}
