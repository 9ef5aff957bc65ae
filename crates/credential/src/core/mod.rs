//! Core types for secret rotation

mod identity;
mod secret;

pub use identity::{identity_matches, local_name};
pub use secret::Secret;
