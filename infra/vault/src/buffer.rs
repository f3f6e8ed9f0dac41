//! # SecureBuffer
//!
//! A single-owner container for sensitive bytes.
//!
//! * Storage is reserved with a fallible, exact reservation and never grows in place, so no
//!   reallocation can leave a stale copy of the contents behind.
//! * Every operation that replaces the contents wipes the old bytes first.
//! * Dropping or [`release`](SecureBuffer::release)-ing the buffer zeroes the whole allocation
//!   before it is returned to the allocator.
//! * There is no `Clone`; duplicates are explicit ([`SecureBuffer::from_buffer`],
//!   [`SecureBuffer::copy_from`]) and `Debug` never prints the contents.

use crate::encoding::Encoding;
use crate::error::VaultError;
use crate::random::RandomSource;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Default)]
pub struct SecureBuffer {
    bytes: Vec<u8>,
}

impl SecureBuffer {
    /// An empty buffer that owns no allocation.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// A buffer of `size` zero bytes.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the memory cannot be reserved.
    pub fn zeroed(size: usize) -> Result<Self, VaultError> {
        Ok(Self { bytes: reserve_zeroed(size)? })
    }

    /// A deep copy of `bytes`.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the memory cannot be reserved.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        let mut buf = Self::new();
        buf.copy_from_slice(bytes)?;
        Ok(buf)
    }

    /// `size` bytes drawn from `rng`.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] or [`VaultError::RandomSource`].
    pub fn from_random(size: usize, rng: &dyn RandomSource) -> Result<Self, VaultError> {
        let mut buf = Self::new();
        buf.fill_random(size, rng)?;
        Ok(buf)
    }

    /// A deep copy of another buffer.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the memory cannot be reserved.
    pub fn from_buffer(other: &Self) -> Result<Self, VaultError> {
        Self::from_bytes(other.as_slice())
    }

    /// Concatenates `parts` into one exactly-sized buffer.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the memory cannot be reserved.
    pub fn concat(parts: &[&[u8]]) -> Result<Self, VaultError> {
        let total = parts
            .iter()
            .try_fold(0usize, |acc, p| acc.checked_add(p.len()))
            .ok_or_else(|| VaultError::Allocation {
                message: "Concatenated length overflows".into(),
                context: None,
            })?;

        let mut buf = Self::zeroed(total)?;
        let mut offset = 0;
        for part in parts {
            buf.bytes[offset..offset + part.len()].copy_from_slice(part);
            offset += part.len();
        }
        Ok(buf)
    }

    /// Replaces the contents with `size` zero bytes, wiping the old contents first.
    ///
    /// On failure the buffer is left empty.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the memory cannot be reserved.
    pub fn allocate(&mut self, size: usize) -> Result<(), VaultError> {
        self.release();
        self.bytes = reserve_zeroed(size)?;
        Ok(())
    }

    /// Replaces the contents with `size` random bytes.
    ///
    /// On failure the buffer is left empty.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] or [`VaultError::RandomSource`].
    pub fn fill_random(&mut self, size: usize, rng: &dyn RandomSource) -> Result<(), VaultError> {
        self.allocate(size)?;
        if let Err(e) = rng.fill(&mut self.bytes) {
            self.release();
            return Err(e);
        }
        Ok(())
    }

    /// Replaces the contents with a copy of `bytes`.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the memory cannot be reserved.
    pub fn copy_from_slice(&mut self, bytes: &[u8]) -> Result<(), VaultError> {
        self.allocate(bytes.len())?;
        self.bytes.copy_from_slice(bytes);
        Ok(())
    }

    /// Replaces the contents with a copy of `other`.
    ///
    /// `buf.copy_from(&buf)` does not compile: a buffer can never be copied onto itself.
    ///
    /// # Errors
    /// [`VaultError::Allocation`] if the memory cannot be reserved.
    pub fn copy_from(&mut self, other: &Self) -> Result<(), VaultError> {
        self.copy_from_slice(other.as_slice())
    }

    /// Takes over the storage of `other`, wiping the current contents first.
    ///
    /// `other` is left empty. The bytes are moved, not copied.
    pub fn move_from(&mut self, other: &mut Self) {
        self.release();
        self.bytes = std::mem::take(&mut other.bytes);
    }

    /// Moves the contents out, leaving `self` empty.
    #[must_use]
    pub fn take(&mut self) -> Self {
        Self { bytes: std::mem::take(&mut self.bytes) }
    }

    /// Bounds-checked read.
    ///
    /// # Errors
    /// [`VaultError::OutOfBounds`] when `index >= len`.
    pub fn get(&self, index: usize) -> Result<u8, VaultError> {
        self.bytes.get(index).copied().ok_or_else(|| self.out_of_bounds(index))
    }

    /// Bounds-checked write.
    ///
    /// # Errors
    /// [`VaultError::OutOfBounds`] when `index >= len`.
    pub fn set(&mut self, index: usize, value: u8) -> Result<(), VaultError> {
        let len = self.bytes.len();
        match self.bytes.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            },
            None => Err(VaultError::OutOfBounds { index, len, context: None }),
        }
    }

    /// Zeroes every byte in place, keeping the length.
    pub fn wipe(&mut self) {
        self.bytes.as_mut_slice().zeroize();
    }

    /// Zeroes and frees the storage. Idempotent.
    pub fn release(&mut self) {
        self.bytes.zeroize();
        self.bytes = Vec::new();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Renders the contents as text.
    ///
    /// Meant for non-secret data such as salts and ciphertexts.
    #[must_use]
    pub fn to_encoded(&self, encoding: Encoding) -> String {
        encoding.encode(&self.bytes)
    }

    fn out_of_bounds(&self, index: usize) -> VaultError {
        VaultError::OutOfBounds { index, len: self.bytes.len(), context: None }
    }
}

fn reserve_zeroed(size: usize) -> Result<Vec<u8>, VaultError> {
    let mut bytes = Vec::new();
    bytes.try_reserve_exact(size).map_err(|e| VaultError::Allocation {
        message: format!("Cannot reserve {size} bytes: {e}").into(),
        context: None,
    })?;
    bytes.resize(size, 0);
    Ok(bytes)
}

impl Drop for SecureBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl ZeroizeOnDrop for SecureBuffer {}

impl AsRef<[u8]> for SecureBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SecureBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBuffer").field("len", &self.bytes.len()).finish_non_exhaustive()
    }
}
