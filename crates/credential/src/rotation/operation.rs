//! Operation codes accepted from the caller

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::RotationError;

/// What a run does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Generate, store, converge, then propagate
    RotateAndPropagate,
    /// Re-push the currently stored secret without generating one
    PropagateOnly,
    /// List accounts with their stored secrets
    DisplaySecrets,
    /// List directory-sync instances and their status
    DisplayDirectoryStatus,
    /// Attempt a login with each stored secret
    ProbeLogin,
    /// Re-deploy stored secrets to every host's credential cache
    RepairDeployment,
}

impl Operation {
    /// Every operation, in menu order
    pub const ALL: [Self; 6] = [
        Self::RotateAndPropagate,
        Self::PropagateOnly,
        Self::DisplaySecrets,
        Self::DisplayDirectoryStatus,
        Self::ProbeLogin,
        Self::RepairDeployment,
    ];

    /// Stable kebab-case code
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RotateAndPropagate => "rotate-and-propagate",
            Self::PropagateOnly => "propagate-only",
            Self::DisplaySecrets => "display-secrets",
            Self::DisplayDirectoryStatus => "display-directory-status",
            Self::ProbeLogin => "probe-login",
            Self::RepairDeployment => "repair-deployment",
        }
    }

    /// Whether the operation changes platform state and needs confirmation
    pub const fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::RotateAndPropagate | Self::PropagateOnly | Self::RepairDeployment
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = RotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RotationError::configuration(format!("unknown operation '{s}'")))
    }
}
