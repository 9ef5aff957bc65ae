//! Resilience patterns

pub mod poll;
