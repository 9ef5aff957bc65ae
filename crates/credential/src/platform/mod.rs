//! Platform adapter boundary
//!
//! Everything keyshift reads from or writes to lives behind these traits.
//! Adapters are queried on every call; nothing here is cached by the
//! orchestrator, so topology changes mid-run are picked up immediately.

mod error;
mod types;

pub use error::{PlatformError, PlatformResult};
pub use types::{
    BackgroundJob, Host, HostRole, InstanceStatus, OsService, PoolIdentityType, PoolState,
    ScheduledTask, SyncInstance, TargetApplication, WorkerPool, WorkflowComponent,
};

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Secret;

/// Authoritative store of managed account secrets
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Managed account identities, in enumeration order
    async fn list_accounts(&self) -> PlatformResult<Vec<String>>;

    /// Current stored secret
    ///
    /// Returns `NotFound` for an unknown identity.
    async fn read(&self, identity: &str) -> PlatformResult<Secret>;

    /// Store a new secret
    ///
    /// Starts the platform's asynchronous convergence and returns without
    /// waiting for it.
    async fn write(&self, identity: &str, secret: &Secret) -> PlatformResult<()>;

    /// Re-deploy the stored secret to every host's local credential cache
    async fn repair_deployment(&self, identity: &str) -> PlatformResult<()>;
}

/// Listing of the platform's background jobs
#[async_trait]
pub trait JobMonitor: Send + Sync {
    /// Jobs currently queued or running
    async fn list_jobs(&self) -> PlatformResult<Vec<BackgroundJob>>;
}

/// Hosts participating in the farm
#[async_trait]
pub trait FleetTopology: Send + Sync {
    /// Every registered host, including ones flagged invalid
    async fn hosts(&self) -> PlatformResult<Vec<Host>>;
}

/// Host-local resources: OS services, scheduled tasks, worker pools
#[async_trait]
pub trait HostAgent: Send + Sync {
    /// OS services installed on a host
    async fn services(&self, host: &str) -> PlatformResult<Vec<OsService>>;

    /// Change a service's logon identity in place (no restart)
    async fn set_service_logon(
        &self,
        host: &str,
        service: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()>;

    /// Scheduled tasks registered on a host
    async fn scheduled_tasks(&self, host: &str) -> PlatformResult<Vec<ScheduledTask>>;

    /// Update a task's stored run-as credential
    async fn set_task_credential(
        &self,
        host: &str,
        task: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()>;

    /// Worker pools configured on a host
    async fn worker_pools(&self, host: &str) -> PlatformResult<Vec<WorkerPool>>;

    /// Rewrite a pool's identity as a specific user and commit the change
    async fn set_pool_identity(
        &self,
        host: &str,
        pool: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()>;

    /// Start a pool
    async fn start_pool(&self, host: &str, pool: &str) -> PlatformResult<()>;

    /// Recycle a pool's worker processes
    async fn recycle_pool(&self, host: &str, pool: &str) -> PlatformResult<()>;
}

/// Directory-synchronization subsystem
#[async_trait]
pub trait DirectorySync: Send + Sync {
    /// Every sync service instance in the farm
    async fn instances(&self) -> PlatformResult<Vec<SyncInstance>>;

    /// The farm's administrative host
    async fn admin_host(&self) -> PlatformResult<String>;

    /// Rebind the sync service account on a host
    async fn bind_account(&self, host: &str, identity: &str, secret: &Secret)
    -> PlatformResult<()>;

    /// Re-provision the sync service after a binding change
    async fn provision(&self, host: &str) -> PlatformResult<()>;

    /// Issue a start for the sync instance on a host
    async fn start(&self, host: &str) -> PlatformResult<()>;

    /// Current status of the sync instance on a host
    async fn status(&self, host: &str) -> PlatformResult<InstanceStatus>;
}

/// Enterprise search administration
#[async_trait]
pub trait SearchAdmin: Send + Sync {
    /// Rebind the search service run-as credential
    async fn set_service_account(&self, identity: &str, secret: &Secret) -> PlatformResult<()>;

    /// Rebind the crawler's default content-access credential
    async fn set_content_access_account(&self, identity: &str, secret: &Secret)
    -> PlatformResult<()>;
}

/// Workflow backend administration
#[async_trait]
pub trait WorkflowAdmin: Send + Sync {
    /// Update the run-as credential of a workflow component on a host
    async fn set_run_as(
        &self,
        host: &str,
        component: WorkflowComponent,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()>;
}

/// Secure credential-mapping store for unattended service accounts
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Create the target application if missing; returns whether it was created
    async fn ensure_target(
        &self,
        service_application: &str,
        target: &TargetApplication,
    ) -> PlatformResult<bool>;

    /// Set the group-claim and administrator ACLs on a target
    async fn set_permissions(
        &self,
        service_application: &str,
        target: &TargetApplication,
    ) -> PlatformResult<()>;

    /// Write the (username, secret) pair into a target
    async fn set_credentials(
        &self,
        service_application: &str,
        application_id: &str,
        identity: &str,
        secret: &Secret,
    ) -> PlatformResult<()>;

    /// Point a service application's unattended account at a target
    async fn bind_unattended_account(
        &self,
        service_application: &str,
        application_id: &str,
    ) -> PlatformResult<()>;
}

/// Interactive login check for an account
#[async_trait]
pub trait LoginProbe: Send + Sync {
    /// Whether the identity can authenticate with the secret
    async fn probe(&self, identity: &str, secret: &Secret) -> PlatformResult<bool>;
}

/// Every adapter the orchestrator talks to
#[derive(Clone)]
pub struct Platform {
    /// Authoritative secret store
    pub store: Arc<dyn CredentialStore>,
    /// Background job listing
    pub jobs: Arc<dyn JobMonitor>,
    /// Farm hosts
    pub fleet: Arc<dyn FleetTopology>,
    /// Host-local resources
    pub hosts: Arc<dyn HostAgent>,
    /// Directory synchronization
    pub sync: Arc<dyn DirectorySync>,
    /// Search administration
    pub search: Arc<dyn SearchAdmin>,
    /// Workflow administration
    pub workflow: Arc<dyn WorkflowAdmin>,
    /// Secure store
    pub secure_store: Arc<dyn SecureStore>,
    /// Login checks
    pub login: Arc<dyn LoginProbe>,
}

impl Platform {
    /// Build a platform from one adapter implementing every trait
    pub fn from_shared<T>(adapter: Arc<T>) -> Self
    where
        T: CredentialStore
            + JobMonitor
            + FleetTopology
            + HostAgent
            + DirectorySync
            + SearchAdmin
            + WorkflowAdmin
            + SecureStore
            + LoginProbe
            + 'static,
    {
        Self {
            store: adapter.clone(),
            jobs: adapter.clone(),
            fleet: adapter.clone(),
            hosts: adapter.clone(),
            sync: adapter.clone(),
            search: adapter.clone(),
            workflow: adapter.clone(),
            secure_store: adapter.clone(),
            login: adapter,
        }
    }

    /// Hosts appliers should target, in topology order
    ///
    /// Queried fresh on every call.
    pub async fn valid_hosts(&self) -> PlatformResult<Vec<Host>> {
        let hosts = self.fleet.hosts().await?;
        Ok(hosts.into_iter().filter(|h| h.role.is_valid()).collect())
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
