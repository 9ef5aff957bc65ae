//! Keyshift Resilience - bounded waiting primitives
//!
//! Every place in keyshift that has to wait for an external system to settle
//! (store convergence, a service instance coming online) goes through the
//! single timeout-bounded poll in [`patterns::poll`] instead of a hand-written
//! sleep loop.
//!
//! ```rust,ignore
//! use keyshift_resilience::{PollConfig, PollOutcome, poll_until};
//! use std::time::Duration;
//!
//! let config = PollConfig::new(
//!     Duration::from_secs(5),
//!     Duration::from_secs(2),
//!     Duration::from_secs(15 * 60),
//! );
//! let outcome = poll_until(&config, "sync_online", || async {
//!     Ok::<_, std::io::Error>(service.is_online().await.then_some(()))
//! })
//! .await?;
//! ```
#![forbid(unsafe_code)]

pub mod error;
pub mod patterns;

pub use error::{ResilienceError, ResilienceResult};
pub use patterns::poll::{PollConfig, PollOutcome, poll_until};
