//! Serializable farm inventory backing [`MemoryPlatform`](super::MemoryPlatform)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Secret, identity_matches};
use crate::platform::{
    BackgroundJob, HostRole, OsService, ScheduledTask, SyncInstance, TargetApplication, WorkerPool,
    WorkflowComponent,
};

/// Everything the in-memory platform knows about a farm
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    /// Managed accounts in enumeration order
    pub accounts: Vec<ManagedAccount>,
    /// Farm hosts in topology order
    pub hosts: Vec<HostInventory>,
    /// Farm administrative host
    pub admin_host: Option<String>,
    /// Directory-sync service instances
    pub sync_instances: Vec<SyncInstance>,
    /// Directory-sync service account binding
    pub sync_account: Option<Credential>,
    /// Search service run-as account
    pub search_account: Option<Credential>,
    /// Crawler default content-access account
    pub crawl_account: Option<Credential>,
    /// Workflow backend run-as bindings
    pub workflow: Vec<WorkflowBinding>,
    /// Secure-store target applications
    pub secure_store: Vec<SecureStoreTarget>,
    /// Unattended account binding per service application (target id)
    pub unattended: BTreeMap<String, String>,
    /// Background jobs that never drain
    pub jobs: Vec<BackgroundJob>,
    /// Failure injection and timing of simulated background work
    pub simulation: Simulation,
}

impl Inventory {
    /// Managed account by identity, case-insensitively
    pub fn account(&self, identity: &str) -> Option<&ManagedAccount> {
        self.accounts
            .iter()
            .find(|a| identity_matches(&a.identity, identity))
    }

    /// Host by name, case-insensitively
    pub fn host(&self, name: &str) -> Option<&HostInventory> {
        self.hosts.iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }
}

/// Identity and secret pair held by a farm-level binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bound identity
    pub identity: String,
    /// Bound secret
    pub secret: Secret,
}

impl Credential {
    pub(crate) fn new(identity: &str, secret: &Secret) -> Self {
        Self {
            identity: identity.to_string(),
            secret: secret.clone(),
        }
    }
}

/// A managed account and its current stored secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedAccount {
    /// Domain-qualified identity
    pub identity: String,
    /// Current secret in the authoritative store
    pub secret: Secret,
}

/// Host-local resources of one host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInventory {
    /// Host name
    pub name: String,
    /// Topology role
    pub role: HostRole,
    /// OS services
    #[serde(default)]
    pub services: Vec<HostedService>,
    /// Scheduled tasks
    #[serde(default)]
    pub tasks: Vec<HostedTask>,
    /// Worker pools
    #[serde(default)]
    pub pools: Vec<WorkerPool>,
}

impl HostInventory {
    /// Empty host
    pub fn new(name: impl Into<String>, role: HostRole) -> Self {
        Self {
            name: name.into(),
            role,
            services: Vec::new(),
            tasks: Vec::new(),
            pools: Vec::new(),
        }
    }
}

/// An OS service with the secret its logon was last configured with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedService {
    /// Service name
    pub name: String,
    /// Logon identity
    pub logon: String,
    /// Logon secret, when a domain account
    #[serde(default)]
    pub secret: Option<Secret>,
}

impl HostedService {
    pub(crate) fn view(&self) -> OsService {
        OsService {
            name: self.name.clone(),
            logon: self.logon.clone(),
        }
    }
}

/// A scheduled task with its stored run-as secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedTask {
    /// Task name
    pub name: String,
    /// Run-as identity
    pub run_as: String,
    /// Stored run-as secret
    #[serde(default)]
    pub secret: Option<Secret>,
}

impl HostedTask {
    pub(crate) fn view(&self) -> ScheduledTask {
        ScheduledTask {
            name: self.name.clone(),
            run_as: self.run_as.clone(),
        }
    }
}

/// Workflow component run-as binding on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowBinding {
    /// Host running the component
    pub host: String,
    /// Component
    pub component: WorkflowComponent,
    /// Run-as credential
    pub credential: Credential,
}

/// Secure-store target application and its stored credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureStoreTarget {
    /// Owning service application
    pub service_application: String,
    /// Target definition
    pub target: TargetApplication,
    /// Whether group-claim and administrator ACLs were applied
    #[serde(default)]
    pub permissions_set: bool,
    /// Stored credential
    #[serde(default)]
    pub credential: Option<Credential>,
}

/// Failure injection and simulated background timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// Hosts whose every call fails as unreachable
    pub unreachable_hosts: Vec<String>,
    /// Identities whose store write is rejected
    pub failing_writes: Vec<String>,
    /// Identities whose login probe is refused
    pub rejected_logins: Vec<String>,
    /// Job listings that still show a password job after each store write
    pub convergence_polls: u32,
    /// Status checks a started sync instance spends provisioning
    pub sync_start_polls: u32,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            unreachable_hosts: Vec::new(),
            failing_writes: Vec::new(),
            rejected_logins: Vec::new(),
            convergence_polls: 1,
            sync_start_polls: 1,
        }
    }
}

impl Simulation {
    pub(crate) fn is_unreachable(&self, host: &str) -> bool {
        self.unreachable_hosts
            .iter()
            .any(|h| h.eq_ignore_ascii_case(host))
    }

    pub(crate) fn write_fails(&self, identity: &str) -> bool {
        self.failing_writes
            .iter()
            .any(|i| identity_matches(i, identity))
    }

    pub(crate) fn login_rejected(&self, identity: &str) -> bool {
        self.rejected_logins
            .iter()
            .any(|i| identity_matches(i, identity))
    }
}
