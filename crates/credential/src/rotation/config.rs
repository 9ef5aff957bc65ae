//! Rotation configuration
//!
//! A single [`RotationConfig`] value is injected into the orchestrator; there
//! is no process-wide configuration state.

use std::time::Duration;

use keyshift_resilience::PollConfig;
use serde::{Deserialize, Serialize};

use super::error::{RotationError, RotationResult};
use crate::generator::{GeneratorConfig, PasswordGenerator};
use crate::platform::TargetApplication;
use crate::role::{Role, RoleRule, default_rules};

/// Complete orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RotationConfig {
    /// Secret generation parameters
    pub generator: GeneratorConfig,
    /// Store convergence wait
    pub convergence: ConvergenceConfig,
    /// Repeated store-write cycle for the first account of a run
    pub warmup: WarmupConfig,
    /// Start-and-wait timing for service instances
    pub start_wait: StartWaitConfig,
    /// Role table and role-specific targets
    pub roles: RoleConfig,
}

impl RotationConfig {
    /// Check every section; called by the orchestrator before any mutation
    pub fn validate(&self) -> RotationResult<()> {
        PasswordGenerator::new(&self.generator)?;
        self.convergence
            .poll()
            .validate()
            .map_err(|e| RotationError::configuration(format!("convergence: {e}")))?;
        self.start_wait
            .poll()
            .validate()
            .map_err(|e| RotationError::configuration(format!("start_wait: {e}")))?;
        if self.warmup.cycles == 0 {
            return Err(RotationError::configuration(
                "warmup.cycles must be at least 1",
            ));
        }
        self.roles.validate()
    }
}

/// Convergence polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Sleep after the store write before the first poll
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Delay between job-listing polls
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Give up waiting after this long
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

impl ConvergenceConfig {
    /// Poll parameters for the watcher
    pub const fn poll(&self) -> PollConfig {
        PollConfig::new(self.initial_delay, self.poll_interval, self.timeout)
    }
}

/// Which accounts repeat the store-write/convergence cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarmupPolicy {
    /// Only the first account processed in a run
    #[default]
    FirstAccount,
    /// Every account
    EveryAccount,
    /// No account
    Disabled,
}

/// Warm-up cycle parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Which accounts are warmed up
    pub policy: WarmupPolicy,
    /// Total write/converge cycles for a warmed-up account
    pub cycles: u32,
    /// Pause between consecutive cycles
    #[serde(with = "humantime_serde")]
    pub pause: Duration,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            policy: WarmupPolicy::FirstAccount,
            cycles: 2,
            pause: Duration::from_secs(20),
        }
    }
}

impl WarmupConfig {
    /// Number of write/converge cycles for the account at 1-based `position`
    pub const fn cycles_for(&self, position: usize) -> u32 {
        match self.policy {
            WarmupPolicy::FirstAccount if position == 1 => self.cycles,
            WarmupPolicy::EveryAccount => self.cycles,
            _ => 1,
        }
    }
}

/// Start-and-wait polling parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartWaitConfig {
    /// Delay after the start command before the first status check
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Delay between status checks
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Give up waiting after this long
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for StartWaitConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

impl StartWaitConfig {
    /// Poll parameters for start-and-wait
    pub const fn poll(&self) -> PollConfig {
        PollConfig::new(self.initial_delay, self.poll_interval, self.timeout)
    }
}

/// Role table and role-specific propagation targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Classification table, in priority order
    pub rules: Vec<RoleRule>,
    /// Anti-virus services whose logon follows the `sophos` account
    pub sophos_services: Vec<String>,
    /// OS services whose logon follows the `windows-service` account
    pub windows_services: Vec<String>,
    /// Workflow backend hosts
    pub workflow: WorkflowHosts,
    /// Unattended-account targets
    pub unattended: UnattendedConfig,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            sophos_services: vec![
                "Sophos Agent".to_string(),
                "Sophos AutoUpdate Service".to_string(),
                "Sophos Message Router".to_string(),
            ],
            windows_services: vec![
                "SharePoint Timer Service".to_string(),
                "SharePoint Administration".to_string(),
                "SharePoint Tracing Service".to_string(),
            ],
            workflow: WorkflowHosts::default(),
            unattended: UnattendedConfig::default(),
        }
    }
}

impl RoleConfig {
    fn validate(&self) -> RotationResult<()> {
        if let Some(rule) = self.rules.iter().find(|r| r.patterns.is_empty()) {
            return Err(RotationError::configuration(format!(
                "role rule for '{}' has no patterns",
                rule.role
            )));
        }
        for (role, services) in [
            (Role::Sophos, &self.sophos_services),
            (Role::WindowsService, &self.windows_services),
        ] {
            if services.is_empty() && self.rules.iter().any(|r| r.role == role) {
                return Err(RotationError::configuration(format!(
                    "accounts classified as '{role}' have no OS services to update"
                )));
            }
        }
        for unattended in self.unattended.all() {
            if unattended.service_application.is_empty() || unattended.target.application_id.is_empty()
            {
                return Err(RotationError::configuration(
                    "unattended account targets need a service application and application id",
                ));
            }
        }
        Ok(())
    }
}

/// Hosts of the cooperating workflow backend
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowHosts {
    /// Message/service bus host
    pub bus_host: Option<String>,
    /// Workflow engine host
    pub engine_host: Option<String>,
}

/// Unattended-account target for one service application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnattendedAccount {
    /// Service application whose unattended account is bound
    pub service_application: String,
    /// Secure-store target holding the credential
    pub target: TargetApplication,
}

impl UnattendedAccount {
    fn named(service_application: &str, application_id: &str, friendly_name: &str) -> Self {
        Self {
            service_application: service_application.to_string(),
            target: TargetApplication {
                application_id: application_id.to_string(),
                friendly_name: friendly_name.to_string(),
                group_claim: "NT AUTHORITY\\Authenticated Users".to_string(),
                admin_principals: vec!["BUILTIN\\Administrators".to_string()],
            },
        }
    }
}

/// Unattended-account targets per role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnattendedConfig {
    /// Excel services
    pub excel: UnattendedAccount,
    /// Visio graphics service
    pub visio: UnattendedAccount,
    /// PerformancePoint service
    pub performance_point: UnattendedAccount,
}

impl Default for UnattendedConfig {
    fn default() -> Self {
        Self {
            excel: UnattendedAccount::named(
                "Excel Services Application",
                "ExcelUnattendedAccount",
                "Excel Services Unattended Account",
            ),
            visio: UnattendedAccount::named(
                "Visio Graphics Service",
                "VisioUnattendedAccount",
                "Visio Services Unattended Account",
            ),
            performance_point: UnattendedAccount::named(
                "PerformancePoint Service Application",
                "PerformancePointUnattendedAccount",
                "PerformancePoint Unattended Account",
            ),
        }
    }
}

impl UnattendedConfig {
    fn all(&self) -> [&UnattendedAccount; 3] {
        [&self.excel, &self.visio, &self.performance_point]
    }
}
