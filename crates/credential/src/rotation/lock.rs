//! Per-identity rotation locks
//!
//! Two rotations of the same identity on one orchestrator must never
//! interleave: the second would overwrite the store with a secret the first
//! one is still propagating. Different identities proceed independently.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held for the whole rotation of one identity
pub type RotationGuard = OwnedMutexGuard<()>;

/// In-process lock table keyed by case-folded identity
#[derive(Debug, Default)]
pub struct RotationLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RotationLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, identity: &str) -> Arc<AsyncMutex<()>> {
        let key = identity.trim().to_ascii_lowercase();
        self.locks.lock().entry(key).or_default().clone()
    }

    /// Wait until no other rotation of `identity` is running, then hold it
    pub async fn acquire(&self, identity: &str) -> RotationGuard {
        let lock = self.entry(identity);
        if lock.try_lock().is_err() {
            tracing::info!(identity, "Waiting for an in-flight rotation of the same account");
        }
        lock.lock_owned().await
    }

    /// Hold `identity` only if no other rotation of it is running
    pub fn try_acquire(&self, identity: &str) -> Option<RotationGuard> {
        self.entry(identity).try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_identity_is_exclusive_across_case() {
        let locks = RotationLocks::new();
        let guard = locks.acquire("CONTOSO\\svc_a").await;
        assert!(locks.try_acquire("contoso\\SVC_A").is_none());
        drop(guard);
        assert!(locks.try_acquire("contoso\\SVC_A").is_some());
    }

    #[tokio::test]
    async fn test_different_identities_are_independent() {
        let locks = RotationLocks::new();
        let _a = locks.acquire("CONTOSO\\svc_a").await;
        assert!(locks.try_acquire("CONTOSO\\svc_b").is_some());
    }
}
