//! Values exchanged with platform adapters

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Secret;

/// A farm host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Host name
    pub name: String,
    /// Role of the host in the farm
    pub role: HostRole,
}

impl Host {
    /// Create a host entry
    pub fn new(name: impl Into<String>, role: HostRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Role flag reported by the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostRole {
    /// Application server
    Application,
    /// Web front end
    WebFrontEnd,
    /// Search server
    Search,
    /// Distributed cache host
    DistributedCache,
    /// Any role combination
    Custom,
    /// Registered but not usable; skipped by every applier
    Invalid,
}

impl HostRole {
    /// Whether appliers should target hosts with this role
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }
}

/// A background job in the platform's job listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundJob {
    /// Job name
    pub name: String,
    /// Human-readable description
    pub description: String,
}

/// An operating system service on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsService {
    /// Service name
    pub name: String,
    /// Identity the service logs on as
    pub logon: String,
}

/// A scheduled task on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Task name (including folder path)
    pub name: String,
    /// Identity the task runs as
    pub run_as: String,
}

/// Identity kind of a web-server worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolIdentityType {
    /// Built-in virtual pool account
    ApplicationPoolIdentity,
    /// Network service
    NetworkService,
    /// Local system
    LocalSystem,
    /// Explicit domain account with stored secret
    SpecificUser,
}

/// Running state of a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolState {
    /// Serving requests
    Started,
    /// Not serving requests
    Stopped,
}

/// A web-server worker process pool on a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPool {
    /// Pool name
    pub name: String,
    /// Identity the pool runs as
    pub identity: String,
    /// Identity kind
    pub identity_type: PoolIdentityType,
    /// Stored secret for `SpecificUser` pools
    pub secret: Option<Secret>,
    /// Running state
    pub state: PoolState,
}

/// Status of a service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStatus {
    /// Running
    Online,
    /// Not running
    Disabled,
    /// Starting up
    Provisioning,
    /// Start failed
    Failed,
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Online => "online",
            Self::Disabled => "disabled",
            Self::Provisioning => "provisioning",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// A directory-synchronization service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncInstance {
    /// Host running the instance
    pub host: String,
    /// Current status
    pub status: InstanceStatus,
}

/// Cooperating workflow backend component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowComponent {
    /// Message/service bus host
    ServiceBus,
    /// Workflow engine host
    WorkflowEngine,
}

impl fmt::Display for WorkflowComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceBus => f.write_str("service-bus"),
            Self::WorkflowEngine => f.write_str("workflow-engine"),
        }
    }
}

/// Secure-store target application holding an unattended credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetApplication {
    /// Target application id
    pub application_id: String,
    /// Display name
    pub friendly_name: String,
    /// Group claim granted use of the credential
    pub group_claim: String,
    /// Principals administering the target
    pub admin_principals: Vec<String>,
}
