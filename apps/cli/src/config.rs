//! Layered CLI configuration
//!
//! Defaults, then the optional TOML file, then `KEYSHIFT_*` environment
//! variables (`__` separates nesting levels, e.g.
//! `KEYSHIFT_ROTATION__WARMUP__POLICY=disabled`). Flags are applied last by
//! the caller.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use keyshift_credential::RotationConfig;
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Orchestrator configuration
    pub rotation: RotationConfig,
    /// Default output format
    pub output: OutputFormat,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            ensure!(path.is_file(), "config file {} does not exist", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("KEYSHIFT_").split("__"))
            .extract()
            .context("failed to load configuration")
    }
}
