use crate::buffer::SecureBuffer;
use crate::error::VaultError;
use crate::kdf::HashChain;
use crate::random::RandomSource;
use crate::types::{KEY_LEN, SALT_LEN};
use std::time::{Duration, Instant};

/// Rounds between two clock reads.
const BATCH: u32 = 64;

/// Default wall-clock cost of one password guess.
pub const DEFAULT_TARGET: Duration = Duration::from_secs(1);

/// How the iteration count of a new vault (or a new password) is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calibration {
    /// Measure the hardware and use as many rounds as fit in the duration.
    Target(Duration),
    /// Use a fixed count. Zero is raised to one.
    Fixed(u32),
}

impl Default for Calibration {
    fn default() -> Self {
        Self::Target(DEFAULT_TARGET)
    }
}

impl Calibration {
    /// Resolves the policy to an iteration count (at least 1).
    ///
    /// # Errors
    /// See [`calibrate`].
    pub fn resolve(self, rng: &dyn RandomSource) -> Result<u32, VaultError> {
        match self {
            Self::Target(target) => calibrate(target, rng),
            Self::Fixed(n) => Ok(n.max(1)),
        }
    }
}

/// Counts the hash-chain rounds this machine completes within `target`.
///
/// Runs the production step against a throwaway random password and salt, which are wiped
/// before returning. Not cancellable; always returns at least 1.
///
/// # Errors
/// [`VaultError::RandomSource`] or [`VaultError::Allocation`] while preparing the throwaway
/// inputs, [`VaultError::Kdf`] if a step fails.
pub fn calibrate(target: Duration, rng: &dyn RandomSource) -> Result<u32, VaultError> {
    let password = SecureBuffer::from_random(KEY_LEN, rng)?;
    let salt = SecureBuffer::from_random(SALT_LEN, rng)?;

    let start = Instant::now();
    let mut chain = HashChain::new(password.as_slice(), salt.as_slice())?;

    while start.elapsed() < target && chain.rounds() < u32::MAX {
        for _ in 0..BATCH {
            chain.step()?;
        }
    }

    Ok(chain.rounds().max(1))
}
