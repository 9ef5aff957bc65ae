//! keyshift - service account secret rotation
//!
//! Runs one operation against a farm inventory file. The inventory backs the
//! in-memory platform, so every operation can be rehearsed offline; mutating
//! operations write the updated inventory back.

mod config;
mod confirm;
mod output;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use keyshift_credential::providers::{Inventory, MemoryPlatform};
use keyshift_credential::{Operation, Platform, RotationOrchestrator, Scope};
use keyshift_log::LoggerBuilder;
use uuid::Uuid;

use config::CliConfig;
use output::OutputFormat;

/// Rotate service account secrets and propagate them across a farm
#[derive(Debug, Parser)]
#[command(name = "keyshift", version, about, long_about = None)]
struct Cli {
    /// Farm inventory file (JSON)
    #[arg(long, env = "KEYSHIFT_INVENTORY")]
    inventory: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, env = "KEYSHIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Only process the account with this identity (case-insensitive)
    #[arg(short, long)]
    identity: Option<String>,

    /// Skip the confirmation prompt for mutating operations
    #[arg(long)]
    yes: bool,

    /// Show secrets in clear text
    #[arg(long)]
    reveal: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Also write the log to this transcript file
    #[arg(long, env = "KEYSHIFT_TRANSCRIPT")]
    transcript: Option<PathBuf>,

    /// Operation: rotate-and-propagate, propagate-only, display-secrets,
    /// display-directory-status, probe-login, repair-deployment
    #[arg(value_parser = parse_operation)]
    operation: Operation,
}

fn parse_operation(value: &str) -> Result<Operation, String> {
    value.parse::<Operation>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?;

    let mut log = keyshift_log::Config::from_env();
    if let Some(path) = &cli.transcript {
        log = log.with_transcript(path);
    }
    let _log_guard = LoggerBuilder::from_config(log)
        .run_id(Uuid::new_v4().to_string())
        .build()
        .context("failed to initialize logging")?;

    let format = cli.output.unwrap_or(config.output);
    let scope = Scope::from_filter(cli.identity.as_deref());
    let inventory = load_inventory(&cli.inventory)?;

    if cli.operation.is_mutating() && !cli.yes {
        let confirmed = confirm::confirm(
            cli.operation,
            &scope,
            &mut io::stdin().lock(),
            &mut io::stderr(),
        )
        .context("failed to read confirmation")?;
        if !confirmed {
            tracing::warn!(operation = %cli.operation, "Not confirmed, aborting");
            eprintln!("Aborted: confirmation not given, nothing was changed.");
            return Ok(());
        }
    }

    let platform = Arc::new(MemoryPlatform::new(inventory));
    let orchestrator =
        RotationOrchestrator::new(Platform::from_shared(platform.clone()), config.rotation)
            .context("invalid rotation configuration")?;

    tracing::info!(operation = %cli.operation, scope = %scope, "Starting operation");
    run_and_save(&orchestrator, &platform, &cli, &scope, format).await
}

/// Run the operation, then write the inventory back after a mutating one,
/// including when the run aborted after rotating some accounts
async fn run_and_save(
    orchestrator: &RotationOrchestrator,
    platform: &MemoryPlatform,
    cli: &Cli,
    scope: &Scope,
    format: OutputFormat,
) -> Result<()> {
    let outcome = run(orchestrator, cli, scope, format).await;
    if cli.operation.is_mutating() {
        save_inventory(&cli.inventory, &platform.snapshot())?;
    }
    outcome
}

async fn run(
    orchestrator: &RotationOrchestrator,
    cli: &Cli,
    scope: &Scope,
    format: OutputFormat,
) -> Result<()> {
    let mut out = io::stdout().lock();
    match cli.operation {
        Operation::RotateAndPropagate | Operation::PropagateOnly => {
            let propagate_only = cli.operation == Operation::PropagateOnly;
            let report = orchestrator.rotate(scope, propagate_only).await?;
            output::run_report(&mut out, &report, format)?;
        }
        Operation::DisplaySecrets => {
            let checks = orchestrator.display_secrets(scope).await?;
            output::secrets(&mut out, &checks, cli.reveal, format)?;
        }
        Operation::DisplayDirectoryStatus => {
            let instances = orchestrator.directory_status().await?;
            output::instances(&mut out, &instances, format)?;
        }
        Operation::ProbeLogin => {
            let checks = orchestrator.probe_logins(scope).await?;
            output::probes(&mut out, &checks, format)?;
        }
        Operation::RepairDeployment => {
            let checks = orchestrator.repair_deployment(scope).await?;
            output::repairs(&mut out, &checks, format)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn load_inventory(path: &Path) -> Result<Inventory> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read inventory {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid inventory {}", path.display()))
}

fn save_inventory(path: &Path, inventory: &Inventory) -> Result<()> {
    let json = serde_json::to_string_pretty(inventory)?;
    std::fs::write(path, json + "\n")
        .with_context(|| format!("failed to write inventory {}", path.display()))?;
    tracing::info!(path = %path.display(), "Inventory saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyshift_credential::providers::ManagedAccount;
    use keyshift_credential::{
        OsRandom, RotationConfig, RotationError, RotationResult, Secret, SecureRandom,
    };

    /// OS randomness that runs dry after a fixed number of draws
    struct DrainingRandom {
        left: u32,
    }

    impl SecureRandom for DrainingRandom {
        fn next_u32(&mut self) -> RotationResult<u32> {
            if self.left == 0 {
                return Err(RotationError::Entropy("entropy source closed".to_string()));
            }
            self.left -= 1;
            OsRandom.next_u32()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_inventory_is_saved_when_run_aborts() {
        // GIVEN two accounts and a random source that fails while generating
        // the second secret (one secret takes 48 draws)
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farm.json");
        let inventory = Inventory {
            accounts: ["CONTOSO\\svc_a", "CONTOSO\\svc_b"]
                .into_iter()
                .map(|identity| ManagedAccount {
                    identity: identity.to_string(),
                    secret: Secret::new("old"),
                })
                .collect(),
            ..Inventory::default()
        };
        save_inventory(&path, &inventory).unwrap();
        let cli = Cli::parse_from([
            "keyshift",
            "--inventory",
            path.to_str().unwrap(),
            "--yes",
            "rotate-and-propagate",
        ]);
        let platform = Arc::new(MemoryPlatform::new(inventory));
        let orchestrator = RotationOrchestrator::new(
            Platform::from_shared(platform.clone()),
            RotationConfig::default(),
        )
        .unwrap()
        .with_random(DrainingRandom { left: 60 });

        // WHEN the run aborts on the second account
        let err = run_and_save(&orchestrator, &platform, &cli, &Scope::All, OutputFormat::Json)
            .await
            .unwrap_err();

        // THEN the first account's new secret is on disk anyway
        assert!(err.downcast_ref::<RotationError>().is_some_and(RotationError::is_fatal));
        let saved = load_inventory(&path).unwrap();
        assert_ne!(saved.accounts[0].secret.expose(), "old");
        assert_eq!(saved.accounts[1].secret.expose(), "old");
    }
}
