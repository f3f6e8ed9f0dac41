//! Iterated SHA-384 hash chain.
//!
//! ```text
//! work = password ‖ salt
//! d₁   = SHA-384(work)
//! dᵢ   = SHA-384(dᵢ₋₁ ‖ work)        i = 2..=iterations
//! key  = d[0..32]   iv = d[32..44]
//! ```

use crate::buffer::SecureBuffer;
use crate::error::VaultError;
use crate::record::Salt;
use crate::types::{DIGEST_LEN, KEY_LEN, SALT_LEN};
use sha2::digest::Output;
use sha2::{Digest, Sha384};
use std::fmt;

/// KDF output: a 32-byte key and a 12-byte derived IV.
#[derive(Debug)]
pub struct KeyMaterial {
    key: SecureBuffer,
    iv: SecureBuffer,
}

impl KeyMaterial {
    #[must_use]
    pub fn key(&self) -> &[u8] {
        self.key.as_slice()
    }

    #[must_use]
    pub fn iv(&self) -> &[u8] {
        self.iv.as_slice()
    }
}

/// One hash chain in progress.
///
/// The working buffer and the running digest live in [`SecureBuffer`]s and are wiped when the
/// chain is dropped, including on early return.
pub struct HashChain {
    hasher: Sha384,
    work: SecureBuffer,
    digest: SecureBuffer,
    rounds: u32,
}

impl HashChain {
    /// Starts a chain and computes the first digest.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the working buffers cannot be reserved.
    pub fn new(password: &[u8], salt: &[u8]) -> Result<Self, VaultError> {
        let mut chain = Self {
            hasher: Sha384::new(),
            work: SecureBuffer::concat(&[password, salt])?,
            digest: SecureBuffer::zeroed(DIGEST_LEN)?,
            rounds: 1,
        };

        chain.hasher.update(chain.work.as_slice());
        chain.finalize()?;
        Ok(chain)
    }

    /// Advances the chain by one round.
    ///
    /// # Errors
    /// [`VaultError::Kdf`] if the digest buffer has the wrong size.
    pub fn step(&mut self) -> Result<(), VaultError> {
        self.hasher.update(self.digest.as_slice());
        self.hasher.update(self.work.as_slice());
        self.finalize()?;
        self.rounds = self.rounds.saturating_add(1);
        Ok(())
    }

    /// Rounds computed so far, including the initial digest.
    #[must_use]
    pub const fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Splits the current digest into key material and wipes the chain.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the output buffers cannot be reserved.
    pub fn finish(self) -> Result<KeyMaterial, VaultError> {
        let digest = self.digest.as_slice();
        Ok(KeyMaterial {
            key: SecureBuffer::from_bytes(&digest[..KEY_LEN])?,
            iv: SecureBuffer::from_bytes(&digest[KEY_LEN..KEY_LEN + SALT_LEN])?,
        })
    }

    fn finalize(&mut self) -> Result<(), VaultError> {
        let out = <&mut Output<Sha384>>::try_from(self.digest.as_mut_slice()).map_err(|_| {
            VaultError::Kdf { message: "Digest buffer has the wrong size".into(), context: None }
        })?;
        self.hasher.finalize_into_reset(out);
        Ok(())
    }
}

impl fmt::Debug for HashChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashChain").field("rounds", &self.rounds).finish_non_exhaustive()
    }
}

/// Derives key material from `password` and `salt` with `iterations` chain rounds.
///
/// Deterministic: identical inputs always give identical outputs.
///
/// # Errors
/// * [`VaultError::Kdf`] when `iterations` is zero.
/// * [`VaultError::Allocation`] if working buffers cannot be reserved.
pub fn derive_key(
    password: &[u8],
    salt: &Salt,
    iterations: u32,
) -> Result<KeyMaterial, VaultError> {
    if iterations == 0 {
        return Err(VaultError::Kdf {
            message: "Iteration count must be at least 1".into(),
            context: None,
        });
    }

    let mut chain = HashChain::new(password, salt.as_bytes())?;
    for _ in 1..iterations {
        chain.step()?;
    }
    chain.finish()
}
