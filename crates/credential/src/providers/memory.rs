//! In-memory platform
//!
//! Implements every adapter trait over an [`Inventory`]. Each mutating call
//! is appended to a journal so callers can assert on exactly what was
//! touched. Store writes enqueue a password job that drains after
//! [`Simulation::convergence_polls`] job listings.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use super::inventory::{
    Credential, HostInventory, Inventory, SecureStoreTarget, Simulation, WorkflowBinding,
};
use crate::core::{Secret, identity_matches};
use crate::platform::{
    BackgroundJob, CredentialStore, DirectorySync, FleetTopology, Host, HostAgent, InstanceStatus,
    JobMonitor, LoginProbe, OsService, PlatformError, PlatformResult, PoolIdentityType, PoolState,
    ScheduledTask, SearchAdmin, SecureStore, SyncInstance, TargetApplication, WorkerPool,
    WorkflowAdmin, WorkflowComponent,
};

/// A mutating call received by [`MemoryPlatform`]
///
/// Secrets are never journaled; inspect [`MemoryPlatform::snapshot`] for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Mutation {
    StoreWrite { identity: String },
    RepairDeployment { identity: String },
    ServiceLogon { host: String, service: String, identity: String },
    TaskCredential { host: String, task: String, identity: String },
    PoolIdentity { host: String, pool: String, identity: String },
    PoolStart { host: String, pool: String },
    PoolRecycle { host: String, pool: String },
    SyncBind { host: String, identity: String },
    SyncProvision { host: String },
    SyncStart { host: String },
    SearchAccount { identity: String },
    CrawlAccount { identity: String },
    WorkflowRunAs { host: String, component: WorkflowComponent, identity: String },
    TargetCreated { service_application: String, application_id: String },
    TargetPermissions { service_application: String, application_id: String },
    TargetCredentials { service_application: String, application_id: String, identity: String },
    UnattendedBinding { service_application: String, application_id: String },
}

impl Mutation {
    /// Host the call was addressed to, if host-local
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::ServiceLogon { host, .. }
            | Self::TaskCredential { host, .. }
            | Self::PoolIdentity { host, .. }
            | Self::PoolStart { host, .. }
            | Self::PoolRecycle { host, .. }
            | Self::SyncBind { host, .. }
            | Self::SyncProvision { host }
            | Self::SyncStart { host }
            | Self::WorkflowRunAs { host, .. } => Some(host.as_str()),
            _ => None,
        }
    }

    /// Whether this is a write to the authoritative store
    pub const fn is_store_write(&self) -> bool {
        matches!(self, Self::StoreWrite { .. })
    }
}

#[derive(Debug)]
struct PendingJob {
    job: BackgroundJob,
    remaining: u32,
}

#[derive(Debug)]
struct StartingInstance {
    host: String,
    remaining: u32,
}

#[derive(Debug, Default)]
struct State {
    inventory: Inventory,
    pending_jobs: Vec<PendingJob>,
    starting: Vec<StartingInstance>,
    journal: Vec<Mutation>,
    job_listings: u32,
}

impl State {
    fn host_mut(&mut self, name: &str) -> PlatformResult<&mut HostInventory> {
        if self.inventory.simulation.is_unreachable(name) {
            return Err(PlatformError::unreachable(name, "host did not respond"));
        }
        self.inventory
            .hosts
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| PlatformError::not_found("host", name))
    }

    fn reachable(&self, name: &str) -> PlatformResult<()> {
        if self.inventory.simulation.is_unreachable(name) {
            return Err(PlatformError::unreachable(name, "host did not respond"));
        }
        Ok(())
    }

    fn target_mut(
        &mut self,
        service_application: &str,
        application_id: &str,
    ) -> PlatformResult<&mut SecureStoreTarget> {
        self.inventory
            .secure_store
            .iter_mut()
            .find(|t| {
                t.service_application.eq_ignore_ascii_case(service_application)
                    && t.target.application_id.eq_ignore_ascii_case(application_id)
            })
            .ok_or_else(|| PlatformError::not_found("secure-store target", application_id))
    }

    fn sync_instance_mut(&mut self, host: &str) -> Option<&mut SyncInstance> {
        self.inventory
            .sync_instances
            .iter_mut()
            .find(|i| i.host.eq_ignore_ascii_case(host))
    }
}

/// Offline platform backed by an [`Inventory`]
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl MemoryPlatform {
    /// Platform over `inventory`
    pub fn new(inventory: Inventory) -> Self {
        Self {
            state: Mutex::new(State {
                inventory,
                ..State::default()
            }),
        }
    }

    /// Current inventory, including every secret written so far
    pub fn snapshot(&self) -> Inventory {
        self.state.lock().inventory.clone()
    }

    /// Mutating calls received, in order
    pub fn journal(&self) -> Vec<Mutation> {
        self.state.lock().journal.clone()
    }

    /// Number of job listings served
    pub fn job_listings(&self) -> u32 {
        self.state.lock().job_listings
    }

    /// Adjust failure injection and timing
    pub fn simulate(&self, configure: impl FnOnce(&mut Simulation)) {
        configure(&mut self.state.lock().inventory.simulation);
    }

    fn record(state: &mut State, mutation: Mutation) {
        tracing::trace!(?mutation, "Memory platform mutation");
        state.journal.push(mutation);
    }
}

#[async_trait]
impl CredentialStore for MemoryPlatform {
    async fn list_accounts(&self) -> PlatformResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .inventory
            .accounts
            .iter()
            .map(|a| a.identity.clone())
            .collect())
    }

    async fn read(&self, identity: &str) -> PlatformResult<Secret> {
        let state = self.state.lock();
        state
            .inventory
            .account(identity)
            .map(|a| a.secret.clone())
            .ok_or_else(|| PlatformError::not_found("managed account", identity))
    }

    async fn write(&self, identity: &str, secret: &Secret) -> PlatformResult<()> {
        let mut state = self.state.lock();
        if state.inventory.simulation.write_fails(identity) {
            return Err(PlatformError::rejected(
                "store write",
                format!("password policy rejected the secret for {identity}"),
            ));
        }
        let account = state
            .inventory
            .accounts
            .iter_mut()
            .find(|a| identity_matches(&a.identity, identity))
            .ok_or_else(|| PlatformError::not_found("managed account", identity))?;
        account.secret = secret.clone();

        let polls = state.inventory.simulation.convergence_polls;
        if polls > 0 {
            state.pending_jobs.push(PendingJob {
                job: BackgroundJob {
                    name: "job-password-management".to_string(),
                    description: format!("Updating password for managed account {identity}"),
                },
                remaining: polls,
            });
        }
        Self::record(&mut state, Mutation::StoreWrite {
            identity: identity.to_string(),
        });
        Ok(())
    }

    async fn repair_deployment(&self, identity: &str) -> PlatformResult<()> {
        let mut state = self.state.lock();
        if state.inventory.account(identity).is_none() {
            return Err(PlatformError::not_found("managed account", identity));
        }
        Self::record(&mut state, Mutation::RepairDeployment {
            identity: identity.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl JobMonitor for MemoryPlatform {
    async fn list_jobs(&self) -> PlatformResult<Vec<BackgroundJob>> {
        let mut state = self.state.lock();
        state.job_listings += 1;
        let mut jobs = state.inventory.jobs.clone();
        jobs.extend(state.pending_jobs.iter().map(|p| p.job.clone()));
        for pending in &mut state.pending_jobs {
            pending.remaining = pending.remaining.saturating_sub(1);
        }
        state.pending_jobs.retain(|p| p.remaining > 0);
        Ok(jobs)
    }
}

#[async_trait]
impl FleetTopology for MemoryPlatform {
    async fn hosts(&self) -> PlatformResult<Vec<Host>> {
        let state = self.state.lock();
        Ok(state
            .inventory
            .hosts
            .iter()
            .map(|h| Host::new(&h.name, h.role))
            .collect())
    }
}

#[async_trait]
impl HostAgent for MemoryPlatform {
    async fn services(&self, host: &str) -> PlatformResult<Vec<OsService>> {
        let mut state = self.state.lock();
        Ok(state.host_mut(host)?.services.iter().map(|s| s.view()).collect())
    }

    async fn set_service_logon(
        &self,
        host: &str,
        service: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()> {
        let mut state = self.state.lock();
        let entry = state
            .host_mut(host)?
            .services
            .iter_mut()
            .find(|s| s.name.eq_ignore_ascii_case(service))
            .ok_or_else(|| PlatformError::not_found("service", service))?;
        entry.logon = identity.to_string();
        entry.secret = Some(secret.clone());
        Self::record(&mut state, Mutation::ServiceLogon {
            host: host.to_string(),
            service: service.to_string(),
            identity: identity.to_string(),
        });
        Ok(())
    }

    async fn scheduled_tasks(&self, host: &str) -> PlatformResult<Vec<ScheduledTask>> {
        let mut state = self.state.lock();
        Ok(state.host_mut(host)?.tasks.iter().map(|t| t.view()).collect())
    }

    async fn set_task_credential(
        &self,
        host: &str,
        task: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()> {
        let mut state = self.state.lock();
        let entry = state
            .host_mut(host)?
            .tasks
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(task))
            .ok_or_else(|| PlatformError::not_found("scheduled task", task))?;
        entry.run_as = identity.to_string();
        entry.secret = Some(secret.clone());
        Self::record(&mut state, Mutation::TaskCredential {
            host: host.to_string(),
            task: task.to_string(),
            identity: identity.to_string(),
        });
        Ok(())
    }

    async fn worker_pools(&self, host: &str) -> PlatformResult<Vec<WorkerPool>> {
        let mut state = self.state.lock();
        Ok(state.host_mut(host)?.pools.clone())
    }

    async fn set_pool_identity(
        &self,
        host: &str,
        pool: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()> {
        let mut state = self.state.lock();
        let entry = find_pool(state.host_mut(host)?, pool)?;
        entry.identity = identity.to_string();
        entry.identity_type = PoolIdentityType::SpecificUser;
        entry.secret = Some(secret.clone());
        Self::record(&mut state, Mutation::PoolIdentity {
            host: host.to_string(),
            pool: pool.to_string(),
            identity: identity.to_string(),
        });
        Ok(())
    }

    async fn start_pool(&self, host: &str, pool: &str) -> PlatformResult<()> {
        let mut state = self.state.lock();
        find_pool(state.host_mut(host)?, pool)?.state = PoolState::Started;
        Self::record(&mut state, Mutation::PoolStart {
            host: host.to_string(),
            pool: pool.to_string(),
        });
        Ok(())
    }

    async fn recycle_pool(&self, host: &str, pool: &str) -> PlatformResult<()> {
        let mut state = self.state.lock();
        find_pool(state.host_mut(host)?, pool)?;
        Self::record(&mut state, Mutation::PoolRecycle {
            host: host.to_string(),
            pool: pool.to_string(),
        });
        Ok(())
    }
}

fn find_pool<'a>(host: &'a mut HostInventory, pool: &str) -> PlatformResult<&'a mut WorkerPool> {
    host.pools
        .iter_mut()
        .find(|p| p.name.eq_ignore_ascii_case(pool))
        .ok_or_else(|| PlatformError::not_found("worker pool", pool))
}

#[async_trait]
impl DirectorySync for MemoryPlatform {
    async fn instances(&self) -> PlatformResult<Vec<SyncInstance>> {
        Ok(self.state.lock().inventory.sync_instances.clone())
    }

    async fn admin_host(&self) -> PlatformResult<String> {
        self.state
            .lock()
            .inventory
            .admin_host
            .clone()
            .ok_or_else(|| PlatformError::Unavailable {
                reason: "farm has no administrative host".to_string(),
            })
    }

    async fn bind_account(&self, host: &str, identity: &str, secret: &Secret) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.host_mut(host)?;
        state.inventory.sync_account = Some(Credential::new(identity, secret));
        Self::record(&mut state, Mutation::SyncBind {
            host: host.to_string(),
            identity: identity.to_string(),
        });
        Ok(())
    }

    async fn provision(&self, host: &str) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.host_mut(host)?;
        Self::record(&mut state, Mutation::SyncProvision {
            host: host.to_string(),
        });
        Ok(())
    }

    async fn start(&self, host: &str) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.host_mut(host)?;
        let polls = state.inventory.simulation.sync_start_polls;
        let status = if polls == 0 {
            InstanceStatus::Online
        } else {
            InstanceStatus::Provisioning
        };
        match state.sync_instance_mut(host) {
            Some(instance) => instance.status = status,
            None => state.inventory.sync_instances.push(SyncInstance {
                host: host.to_string(),
                status,
            }),
        }
        state.starting.retain(|s| !s.host.eq_ignore_ascii_case(host));
        if polls > 0 {
            state.starting.push(StartingInstance {
                host: host.to_string(),
                remaining: polls,
            });
        }
        Self::record(&mut state, Mutation::SyncStart {
            host: host.to_string(),
        });
        Ok(())
    }

    async fn status(&self, host: &str) -> PlatformResult<InstanceStatus> {
        let mut state = self.state.lock();
        state.reachable(host)?;

        let mut came_online = false;
        if let Some(starting) = state
            .starting
            .iter_mut()
            .find(|s| s.host.eq_ignore_ascii_case(host))
        {
            starting.remaining = starting.remaining.saturating_sub(1);
            came_online = starting.remaining == 0;
        }
        if came_online {
            state.starting.retain(|s| !s.host.eq_ignore_ascii_case(host));
            if let Some(instance) = state.sync_instance_mut(host) {
                instance.status = InstanceStatus::Online;
            }
        }

        state
            .sync_instance_mut(host)
            .map(|i| i.status)
            .ok_or_else(|| PlatformError::not_found("sync instance", host))
    }
}

#[async_trait]
impl SearchAdmin for MemoryPlatform {
    async fn set_service_account(&self, identity: &str, secret: &Secret) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.inventory.search_account = Some(Credential::new(identity, secret));
        Self::record(&mut state, Mutation::SearchAccount {
            identity: identity.to_string(),
        });
        Ok(())
    }

    async fn set_content_access_account(&self, identity: &str, secret: &Secret) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.inventory.crawl_account = Some(Credential::new(identity, secret));
        Self::record(&mut state, Mutation::CrawlAccount {
            identity: identity.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl WorkflowAdmin for MemoryPlatform {
    async fn set_run_as(
        &self,
        host: &str,
        component: WorkflowComponent,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.reachable(host)?;
        let credential = Credential::new(identity, secret);
        match state
            .inventory
            .workflow
            .iter_mut()
            .find(|b| b.component == component && b.host.eq_ignore_ascii_case(host))
        {
            Some(binding) => binding.credential = credential,
            None => state.inventory.workflow.push(WorkflowBinding {
                host: host.to_string(),
                component,
                credential,
            }),
        }
        Self::record(&mut state, Mutation::WorkflowRunAs {
            host: host.to_string(),
            component,
            identity: identity.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl SecureStore for MemoryPlatform {
    async fn ensure_target(
        &self,
        service_application: &str,
        target: &TargetApplication,
    ) -> PlatformResult<bool> {
        let mut state = self.state.lock();
        if state
            .target_mut(service_application, &target.application_id)
            .is_ok()
        {
            return Ok(false);
        }
        state.inventory.secure_store.push(SecureStoreTarget {
            service_application: service_application.to_string(),
            target: target.clone(),
            permissions_set: false,
            credential: None,
        });
        Self::record(&mut state, Mutation::TargetCreated {
            service_application: service_application.to_string(),
            application_id: target.application_id.clone(),
        });
        Ok(true)
    }

    async fn set_permissions(
        &self,
        service_application: &str,
        target: &TargetApplication,
    ) -> PlatformResult<()> {
        let mut state = self.state.lock();
        let entry = state.target_mut(service_application, &target.application_id)?;
        entry.target.group_claim.clone_from(&target.group_claim);
        entry.target.admin_principals.clone_from(&target.admin_principals);
        entry.permissions_set = true;
        Self::record(&mut state, Mutation::TargetPermissions {
            service_application: service_application.to_string(),
            application_id: target.application_id.clone(),
        });
        Ok(())
    }

    async fn set_credentials(
        &self,
        service_application: &str,
        application_id: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.target_mut(service_application, application_id)?.credential =
            Some(Credential::new(identity, secret));
        Self::record(&mut state, Mutation::TargetCredentials {
            service_application: service_application.to_string(),
            application_id: application_id.to_string(),
            identity: identity.to_string(),
        });
        Ok(())
    }

    async fn bind_unattended_account(
        &self,
        service_application: &str,
        application_id: &str,
    ) -> PlatformResult<()> {
        let mut state = self.state.lock();
        state.target_mut(service_application, application_id)?;
        state
            .inventory
            .unattended
            .insert(service_application.to_string(), application_id.to_string());
        Self::record(&mut state, Mutation::UnattendedBinding {
            service_application: service_application.to_string(),
            application_id: application_id.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl LoginProbe for MemoryPlatform {
    async fn probe(&self, identity: &str, secret: &Secret) -> PlatformResult<bool> {
        let state = self.state.lock();
        if state.inventory.simulation.login_rejected(identity) {
            return Ok(false);
        }
        Ok(state
            .inventory
            .account(identity)
            .is_some_and(|a| &a.secret == secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::HostRole;
    use pretty_assertions::assert_eq;

    fn platform() -> MemoryPlatform {
        let mut inventory = Inventory::default();
        inventory.accounts.push(crate::providers::ManagedAccount {
            identity: "CONTOSO\\svc_a".to_string(),
            secret: Secret::new("old"),
        });
        inventory.hosts.push(HostInventory::new("app01", HostRole::Application));
        MemoryPlatform::new(inventory)
    }

    #[tokio::test]
    async fn test_write_enqueues_job_that_drains() {
        let platform = platform();
        platform.simulate(|s| s.convergence_polls = 2);
        platform.write("CONTOSO\\svc_a", &Secret::new("new")).await.unwrap();

        assert_eq!(platform.list_jobs().await.unwrap().len(), 1);
        assert_eq!(platform.list_jobs().await.unwrap().len(), 1);
        assert!(platform.list_jobs().await.unwrap().is_empty());
        assert_eq!(platform.read("contoso\\svc_a").await.unwrap().expose(), "new");
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let platform = platform();
        platform.simulate(|s| s.unreachable_hosts.push("app01".to_string()));
        let err = platform.services("app01").await.unwrap_err();
        assert!(matches!(err, PlatformError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_sync_start_comes_online_after_polls() {
        let platform = platform();
        platform.simulate(|s| s.sync_start_polls = 2);
        platform.start("app01").await.unwrap();
        assert_eq!(platform.status("app01").await.unwrap(), InstanceStatus::Provisioning);
        assert_eq!(platform.status("app01").await.unwrap(), InstanceStatus::Online);
    }

    #[tokio::test]
    async fn test_ensure_target_is_idempotent() {
        let platform = platform();
        let target = TargetApplication {
            application_id: "ExcelUnattendedAccount".to_string(),
            friendly_name: "Excel".to_string(),
            group_claim: "Authenticated Users".to_string(),
            admin_principals: vec![],
        };
        assert!(platform.ensure_target("Excel", &target).await.unwrap());
        assert!(!platform.ensure_target("Excel", &target).await.unwrap());
        assert_eq!(platform.journal().len(), 1);
    }
}
