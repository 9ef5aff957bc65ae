//! Timeout-bounded polling
//!
//! A poll waits `initial_delay`, then probes repeatedly every `interval`
//! until the probe reports a value or `timeout` elapses. The timeout budget
//! starts after the initial delay.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};

use crate::error::{ResilienceError, ResilienceResult};

/// Timing parameters for [`poll_until`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the first probe
    #[cfg_attr(feature = "humantime", serde(with = "humantime_serde"))]
    pub initial_delay: Duration,

    /// Delay between consecutive probes
    #[cfg_attr(feature = "humantime", serde(with = "humantime_serde"))]
    pub interval: Duration,

    /// Maximum time spent probing, measured from the first probe
    #[cfg_attr(feature = "humantime", serde(with = "humantime_serde"))]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

impl PollConfig {
    /// Create a new poll configuration
    pub const fn new(initial_delay: Duration, interval: Duration, timeout: Duration) -> Self {
        Self {
            initial_delay,
            interval,
            timeout,
        }
    }

    /// Check that the probe interval is usable
    pub fn validate(&self) -> ResilienceResult<()> {
        if self.interval.is_zero() {
            return Err(ResilienceError::invalid_config(
                "poll interval must be greater than zero",
            ));
        }
        if self.timeout < self.interval {
            return Err(ResilienceError::TimeoutBelowInterval {
                timeout: self.timeout,
                interval: self.interval,
            });
        }
        Ok(())
    }
}

/// How a poll finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value
    Ready {
        /// Value returned by the probe
        value: T,
        /// Number of probes made, including the successful one
        attempts: u32,
        /// Time spent probing
        elapsed: Duration,
    },
    /// The timeout elapsed before the probe produced a value
    TimedOut {
        /// Number of probes made
        attempts: u32,
        /// Time spent probing
        elapsed: Duration,
    },
}

impl<T> PollOutcome<T> {
    /// Whether the probe produced a value
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Number of probes made
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    /// Time spent probing
    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Ready { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    /// Consume the outcome, returning the value if ready
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ready { value, .. } => Some(value),
            Self::TimedOut { .. } => None,
        }
    }
}

/// Poll `probe` until it returns `Ok(Some(_))` or the timeout elapses
///
/// A probe error ends the poll immediately and is returned to the caller;
/// `Ok(None)` means "not yet". The probe is always called at least once,
/// even with a zero timeout.
///
/// # Example
///
/// ```rust,ignore
/// let outcome = poll_until(&config, "jobs_drained", || async {
///     let jobs = monitor.list_jobs().await?;
///     Ok::<_, PlatformError>(jobs.is_empty().then_some(()))
/// })
/// .await?;
/// ```
pub async fn poll_until<F, Fut, T, E>(
    config: &PollConfig,
    operation: &str,
    mut probe: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    if !config.initial_delay.is_zero() {
        sleep(config.initial_delay).await;
    }

    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = probe().await? {
            let elapsed = started.elapsed();
            tracing::debug!(operation, attempts, elapsed_ms = elapsed.as_millis(), "Poll ready");
            return Ok(PollOutcome::Ready {
                value,
                attempts,
                elapsed,
            });
        }

        let elapsed = started.elapsed();
        if elapsed >= config.timeout {
            tracing::warn!(
                operation,
                attempts,
                timeout_ms = config.timeout.as_millis(),
                "Poll timed out"
            );
            return Ok(PollOutcome::TimedOut { attempts, elapsed });
        }

        let remaining = config.timeout - elapsed;
        sleep(config.interval.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = PollConfig::new(Duration::ZERO, Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(
            config.validate(),
            Err(ResilienceError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_timeout_below_interval() {
        let config = PollConfig::new(
            Duration::ZERO,
            Duration::from_secs(10),
            Duration::from_secs(1),
        );
        assert!(matches!(
            config.validate(),
            Err(ResilienceError::TimeoutBelowInterval { .. })
        ));
    }

    #[test]
    fn test_default_matches_start_wait_timing() {
        let config = PollConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(5));
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(900));
        assert!(config.validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_error_stops_polling() {
        let config = PollConfig::new(Duration::ZERO, Duration::from_secs(1), Duration::from_secs(10));
        let mut calls = 0;

        let result: Result<PollOutcome<()>, &str> = poll_until(&config, "failing", || {
            calls += 1;
            async { Err("probe broke") }
        })
        .await;

        assert_eq!(result, Err("probe broke"));
        assert_eq!(calls, 1);
    }
}
