use crate::error::VaultError;
use std::fmt::Debug;

/// Source of cryptographically secure random bytes.
///
/// Injected into the vault so that RNG failures can be exercised; a failure is fatal to
/// [`Vault::generate`](crate::Vault::generate).
pub trait RandomSource: Send + Sync + Debug {
    /// Fills `dest` completely with random bytes.
    ///
    /// # Errors
    /// [`VaultError::RandomSource`] when no bytes can be produced.
    fn fill(&self, dest: &mut [u8]) -> Result<(), VaultError>;
}

/// The operating-system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), VaultError> {
        getrandom::fill(dest).map_err(|e| VaultError::RandomSource {
            message: format!("System RNG unavailable: {e}").into(),
            context: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_random_fills() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        OsRandom.fill(&mut a).unwrap();
        OsRandom.fill(&mut b).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_fill_is_ok() {
        OsRandom.fill(&mut []).unwrap();
    }
}
