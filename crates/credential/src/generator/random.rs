//! Cryptographically secure random source

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::rotation::{RotationError, RotationResult};

/// Uniform 32-bit draws from a cryptographically secure source
///
/// Implementations must never be backed by a non-cryptographic PRNG in
/// production. An error means the entropy source is gone and the run must stop.
pub trait SecureRandom: Send {
    /// Next uniformly distributed `u32`
    fn next_u32(&mut self) -> RotationResult<u32>;
}

/// Operating system CSPRNG (`getrandom` under the hood)
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn next_u32(&mut self) -> RotationResult<u32> {
        OsRng
            .try_next_u32()
            .map_err(|e| RotationError::Entropy(e.to_string()))
    }
}

/// Uniform index in `0..n` by rejection sampling
///
/// Draws below `2^32 mod n` are discarded so every index is equally likely.
pub(crate) fn uniform_index(rng: &mut dyn SecureRandom, n: usize) -> RotationResult<usize> {
    let n = u32::try_from(n)
        .map_err(|_| RotationError::configuration("character group is too large"))?;
    if n == 0 {
        return Err(RotationError::configuration("character group is empty"));
    }
    let threshold = n.wrapping_neg() % n;
    loop {
        let draw = rng.next_u32()?;
        if draw >= threshold {
            return Ok((draw % n) as usize);
        }
    }
}
