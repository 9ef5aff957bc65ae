//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use keyshift_credential::prelude::*;
use keyshift_credential::providers::{HostInventory, HostedService, HostedTask, ManagedAccount};
use keyshift_credential::platform::{HostRole, PoolIdentityType, PoolState, WorkerPool};

pub const APP: &str = "CONTOSO\\svc_app";

pub fn account(identity: &str, secret: &str) -> ManagedAccount {
    ManagedAccount {
        identity: identity.to_string(),
        secret: Secret::new(secret),
    }
}

pub fn host(name: &str) -> HostInventory {
    HostInventory::new(name, HostRole::Application)
}

pub fn pool(name: &str, identity: &str, secret: Option<&str>) -> WorkerPool {
    WorkerPool {
        name: name.to_string(),
        identity: identity.to_string(),
        identity_type: PoolIdentityType::SpecificUser,
        secret: secret.map(Secret::new),
        state: PoolState::Stopped,
    }
}

pub fn service(name: &str, logon: &str) -> HostedService {
    HostedService {
        name: name.to_string(),
        logon: logon.to_string(),
        secret: None,
    }
}

pub fn task(name: &str, run_as: &str) -> HostedTask {
    HostedTask {
        name: name.to_string(),
        run_as: run_as.to_string(),
        secret: None,
    }
}

/// Three application hosts and the given accounts, all with secret `old`
pub fn farm(identities: &[&str]) -> Inventory {
    Inventory {
        accounts: identities.iter().map(|i| account(i, "old")).collect(),
        hosts: vec![host("app01"), host("app02"), host("app03")],
        admin_host: Some("app01".to_string()),
        ..Inventory::default()
    }
}

pub fn platform(inventory: Inventory) -> Arc<MemoryPlatform> {
    Arc::new(MemoryPlatform::new(inventory))
}

pub fn orchestrator(platform: &Arc<MemoryPlatform>) -> RotationOrchestrator {
    orchestrator_with(platform, RotationConfig::default())
}

pub fn orchestrator_with(platform: &Arc<MemoryPlatform>, config: RotationConfig) -> RotationOrchestrator {
    RotationOrchestrator::new(Platform::from_shared(platform.clone()), config)
        .expect("default configuration is valid")
}

/// Store writes journaled for `identity`
pub fn store_writes(platform: &MemoryPlatform, identity: &str) -> usize {
    platform
        .journal()
        .iter()
        .filter(|m| matches!(m, Mutation::StoreWrite { identity: i } if i == identity))
        .count()
}

/// Hosts that received any host-local mutation, in journal order, deduplicated
pub fn touched_hosts(platform: &MemoryPlatform) -> Vec<String> {
    let mut hosts: Vec<String> = Vec::new();
    for mutation in platform.journal() {
        if let Some(host) = mutation.host() {
            if !hosts.iter().any(|h| h == host) {
                hosts.push(host.to_string());
            }
        }
    }
    hosts
}
