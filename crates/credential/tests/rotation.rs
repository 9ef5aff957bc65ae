//! Orchestration sequencing over the in-memory platform
//!
//! Every test runs on a paused clock: convergence waits, warm-up pauses and
//! poll intervals elapse instantly.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use keyshift_credential::prelude::*;
use keyshift_credential::platform::BackgroundJob;
use keyshift_credential::rotation::{ConvergenceOutcome, WarmupPolicy};
use pretty_assertions::assert_eq;

const A: &str = "CONTOSO\\svc_a";
const B: &str = "CONTOSO\\svc_b";
const C: &str = "CONTOSO\\svc_c";

/// Filter matching no account performs zero mutating calls
#[tokio::test(start_paused = true)]
async fn test_unknown_identity_mutates_nothing() {
    // GIVEN a farm with three accounts
    let platform = platform(farm(&[A, B, C]));
    let orchestrator = orchestrator(&platform);

    // WHEN rotating an identity that is not managed
    let report = orchestrator
        .rotate(&Scope::Identity("CONTOSO\\svc_missing".into()), false)
        .await
        .unwrap();

    // THEN the run reports not-found and the journal is empty
    assert!(report.not_found);
    assert_eq!(report.processed, 0);
    assert!(platform.journal().is_empty());
    assert!(matches!(
        report.errors().as_slice(),
        [RotationError::IdentityNotFound { .. }]
    ));
}

/// First account runs two write/converge cycles, later accounts one
#[tokio::test(start_paused = true)]
async fn test_first_account_is_warmed_up() {
    let platform = platform(farm(&[A, B, C]));
    let orchestrator = orchestrator(&platform);

    let report = orchestrator.rotate(&Scope::All, false).await.unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(store_writes(&platform, A), 2);
    assert_eq!(store_writes(&platform, B), 1);
    assert_eq!(store_writes(&platform, C), 1);

    let cycles: Vec<u32> = report.outcomes.iter().map(|o| o.store_writes).collect();
    assert_eq!(cycles, vec![2, 1, 1]);
    assert!(report.outcomes[0].convergence.iter().all(ConvergenceOutcome::is_converged));
    assert!(report.is_clean());
}

/// A filtered run's sole account is the first account and is warmed up
#[tokio::test(start_paused = true)]
async fn test_filtered_account_is_warmed_up() {
    let platform = platform(farm(&[A, B, C]));
    let orchestrator = orchestrator(&platform);

    let report = orchestrator
        .rotate(&Scope::Identity("contoso\\SVC_B".into()), false)
        .await
        .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(store_writes(&platform, B), 2);
    assert_eq!(store_writes(&platform, A), 0);
}

/// Warm-up can be disabled
#[tokio::test(start_paused = true)]
async fn test_warmup_disabled() {
    let platform = platform(farm(&[A, B]));
    let mut config = RotationConfig::default();
    config.warmup.policy = WarmupPolicy::Disabled;
    let orchestrator = orchestrator_with(&platform, config);

    orchestrator.rotate(&Scope::All, false).await.unwrap();

    assert_eq!(store_writes(&platform, A), 1);
    assert_eq!(store_writes(&platform, B), 1);
}

/// The warm-up pause is observed between the repeated writes
#[tokio::test(start_paused = true)]
async fn test_warmup_pause_elapses() {
    let platform = platform(farm(&[A]));
    let orchestrator = orchestrator(&platform);
    let started = tokio::time::Instant::now();

    orchestrator.rotate(&Scope::All, false).await.unwrap();

    // two convergence waits (5 s delay, one pending listing, 5 s interval)
    // plus the 20 s pause
    assert!(started.elapsed() >= Duration::from_secs(20 + 2 * 10));
}

/// A rejected store write fails that account only
#[tokio::test(start_paused = true)]
async fn test_store_write_failure_continues_batch() {
    let mut inventory = farm(&[A, B]);
    inventory.hosts[0].pools.push(pool("PoolA", A, Some("old")));
    inventory.simulation.failing_writes.push(A.to_string());
    let platform = platform(inventory);
    let orchestrator = orchestrator(&platform);

    let report = orchestrator.rotate(&Scope::All, false).await.unwrap();

    assert_eq!(report.outcomes[0].state, JobState::Failed);
    assert!(matches!(
        report.outcomes[0].error,
        Some(RotationError::StoreWrite { .. })
    ));
    assert_eq!(report.outcomes[1].state, JobState::Done);
    // nothing propagated for the failed account
    assert!(!platform
        .journal()
        .iter()
        .any(|m| matches!(m, Mutation::PoolIdentity { identity, .. } if identity == A)));
}

/// One secret per account reaches the store and every target
#[tokio::test(start_paused = true)]
async fn test_same_secret_reaches_store_and_targets() {
    let mut inventory = farm(&[APP]);
    inventory.hosts[0].pools.push(pool("AppPool", APP, Some("old")));
    inventory.hosts[1].tasks.push(task("\\Nightly\\Export", APP));
    inventory.hosts[2].services.push(service("Timer", APP));
    let platform = platform(inventory);
    let orchestrator = orchestrator(&platform);

    orchestrator.rotate(&Scope::All, false).await.unwrap();

    let snapshot = platform.snapshot();
    let stored = snapshot.account(APP).unwrap().secret.clone();
    assert_ne!(stored.expose(), "old");
    assert_eq!(snapshot.hosts[0].pools[0].secret.as_ref(), Some(&stored));
    assert_eq!(snapshot.hosts[1].tasks[0].secret.as_ref(), Some(&stored));
    assert_eq!(snapshot.hosts[2].services[0].secret.as_ref(), Some(&stored));
}

/// Propagate-only re-pushes the stored secret without writing the store
#[tokio::test(start_paused = true)]
async fn test_propagate_only_uses_stored_secret() {
    let mut inventory = farm(&[APP]);
    inventory.hosts[0].tasks.push(task("\\Backup", APP));
    let platform = platform(inventory);
    let orchestrator = orchestrator(&platform);

    let report = orchestrator.rotate(&Scope::All, true).await.unwrap();

    assert_eq!(store_writes(&platform, APP), 0);
    assert_eq!(report.outcomes[0].state, JobState::Done);
    let snapshot = platform.snapshot();
    assert_eq!(
        snapshot.hosts[0].tasks[0].secret.as_ref().map(Secret::expose),
        Some("old")
    );
}

/// A convergence timeout is recorded and propagation still happens
#[tokio::test(start_paused = true)]
async fn test_convergence_timeout_is_not_fatal() {
    let mut inventory = farm(&[APP]);
    inventory.hosts[0].tasks.push(task("\\Backup", APP));
    inventory.jobs.push(BackgroundJob {
        name: "stuck".to_string(),
        description: format!("Password change for {APP} (stuck)"),
    });
    let platform = platform(inventory);
    let mut config = RotationConfig::default();
    config.warmup.policy = WarmupPolicy::Disabled;
    let orchestrator = orchestrator_with(&platform, config);

    let report = orchestrator.rotate(&Scope::All, false).await.unwrap();

    let outcome = &report.outcomes[0];
    assert!(matches!(
        outcome.convergence[0],
        ConvergenceOutcome::TimedOut { .. }
    ));
    assert_eq!(outcome.state, JobState::Done);
    assert_eq!(outcome.updated.len(), 1);
    assert!(report
        .errors()
        .iter()
        .any(|e| matches!(e, RotationError::ConvergenceTimeout { .. })));
    assert_eq!(report.unconverged(), 1);
    assert!(!report.is_clean());
}

struct RefusingJobs;

#[async_trait]
impl JobMonitor for RefusingJobs {
    async fn list_jobs(&self) -> PlatformResult<Vec<BackgroundJob>> {
        Err(PlatformError::unreachable("app01", "job listing refused"))
    }
}

/// A job listing that cannot be read leaves convergence unconfirmed, and the
/// run says so
#[tokio::test(start_paused = true)]
async fn test_unobservable_convergence_is_surfaced() {
    // GIVEN a farm whose background job listing always fails
    let mut inventory = farm(&[APP]);
    inventory.hosts[0].tasks.push(task("\\Backup", APP));
    let platform = platform(inventory);
    let mut adapters = Platform::from_shared(platform.clone());
    adapters.jobs = Arc::new(RefusingJobs);
    let orchestrator = RotationOrchestrator::new(adapters, RotationConfig::default()).unwrap();

    // WHEN the account is rotated (with its warm-up cycle)
    let report = orchestrator.rotate(&Scope::All, false).await.unwrap();

    // THEN propagation still happens but no cycle counts as converged
    let outcome = &report.outcomes[0];
    assert_eq!(outcome.store_writes, 2);
    assert_eq!(outcome.updated.len(), 1);
    assert!(outcome
        .convergence
        .iter()
        .all(|c| matches!(c, ConvergenceOutcome::Unobservable { .. })));
    assert!(!outcome.is_converged());
    let unobservable = report
        .errors()
        .iter()
        .filter(|e| matches!(e, RotationError::ConvergenceUnobservable { .. }))
        .count();
    assert_eq!(unobservable, 2);
    assert_eq!(report.unconverged(), 1);
    assert!(!report.is_clean());
}

struct BrokenRandom;

impl SecureRandom for BrokenRandom {
    fn next_u32(&mut self) -> RotationResult<u32> {
        Err(RotationError::Entropy("device unavailable".into()))
    }
}

/// Entropy failure stops the run before any mutation
#[tokio::test(start_paused = true)]
async fn test_entropy_failure_is_fatal() {
    let platform = platform(farm(&[A, B]));
    let orchestrator = orchestrator(&platform).with_random(BrokenRandom);

    let err = orchestrator.rotate(&Scope::All, false).await.unwrap_err();

    assert!(err.is_fatal());
    assert!(platform.journal().is_empty());
}

/// Invalid configuration is rejected before the orchestrator exists
#[test]
fn test_invalid_configuration_is_rejected() {
    let platform = platform(farm(&[A]));
    let mut config = RotationConfig::default();
    config.generator.length = 0;

    let err = RotationOrchestrator::new(Platform::from_shared(platform), config).unwrap_err();

    assert!(matches!(err, RotationError::Configuration { .. }));
}

/// Two concurrent rotations of one account do not interleave
#[tokio::test(start_paused = true)]
async fn test_concurrent_rotations_are_serialized() {
    let mut inventory = farm(&[APP]);
    inventory.hosts[0].pools.push(pool("AppPool", APP, Some("old")));
    let platform = platform(inventory);
    let orchestrator = orchestrator(&platform);

    let (first, second) = tokio::join!(
        orchestrator.rotate(&Scope::All, false),
        orchestrator.rotate(&Scope::All, false)
    );
    first.unwrap();
    second.unwrap();

    let kinds: Vec<&'static str> = platform
        .journal()
        .iter()
        .map(|m| match m {
            Mutation::StoreWrite { .. } => "write",
            Mutation::PoolIdentity { .. } => "pool",
            Mutation::PoolStart { .. } => "start",
            Mutation::PoolRecycle { .. } => "recycle",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "write", "write", "pool", "start", "recycle", "write", "write", "pool", "start",
            "recycle"
        ]
    );
}

/// Read-only operations
#[tokio::test(start_paused = true)]
async fn test_display_and_probe() {
    let mut inventory = farm(&[A, B]);
    inventory.simulation.rejected_logins.push(B.to_string());
    let platform = platform(inventory);
    let orchestrator = orchestrator(&platform);

    let secrets = orchestrator.display_secrets(&Scope::All).await.unwrap();
    assert_eq!(secrets.checks.len(), 2);
    assert_eq!(secrets.checks[0].result.as_ref().unwrap().expose(), "old");

    let probes = orchestrator.probe_logins(&Scope::All).await.unwrap();
    let passed: Vec<bool> = probes
        .checks
        .iter()
        .map(|c| *c.result.as_ref().unwrap())
        .collect();
    assert_eq!(passed, vec![true, false]);

    let missing = orchestrator
        .probe_logins(&Scope::Identity("nobody".into()))
        .await
        .unwrap();
    assert!(missing.not_found);
    assert!(platform.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_repair_deployment_scoped() {
    let platform = platform(farm(&[A, B]));
    let orchestrator = orchestrator(&platform);

    let repaired = orchestrator
        .repair_deployment(&Scope::Identity(B.into()))
        .await
        .unwrap();

    assert_eq!(repaired.failures(), 0);
    assert_eq!(
        platform.journal(),
        vec![Mutation::RepairDeployment {
            identity: B.to_string()
        }]
    );
}
