//! Start a service instance and wait for it to report online

use keyshift_resilience::poll_until;

use crate::platform::{DirectorySync, InstanceStatus, PlatformError, PlatformResult};
use crate::rotation::config::StartWaitConfig;

/// Ensure the sync instance on `host` is online
///
/// No-op when it already is. Otherwise issues a start and polls the status
/// until it reports online or the configured timeout elapses. Returns whether
/// the instance ended up online.
pub async fn start_and_wait(
    sync: &dyn DirectorySync,
    host: &str,
    config: &StartWaitConfig,
) -> PlatformResult<bool> {
    match sync.status(host).await {
        Ok(InstanceStatus::Online) => {
            tracing::debug!(host, "Sync instance already online");
            return Ok(true);
        }
        // no instance on the host yet; the start provisions one
        Ok(_) | Err(PlatformError::NotFound { .. }) => {}
        Err(error) => return Err(error),
    }

    tracing::info!(host, "Starting sync instance");
    sync.start(host).await?;

    let outcome = poll_until(&config.poll(), "sync_instance_online", || async move {
        let status = sync.status(host).await?;
        Ok::<_, PlatformError>((status == InstanceStatus::Online).then_some(()))
    })
    .await?;

    if outcome.is_ready() {
        tracing::info!(host, attempts = outcome.attempts(), "Sync instance online");
    } else {
        tracing::warn!(
            host,
            waited_secs = outcome.elapsed().as_secs(),
            "Sync instance did not come online"
        );
    }
    Ok(outcome.is_ready())
}
