//! Password-protected storage for a long-lived master secret.
//!
//! The crate keeps a wallet master key encrypted at rest under a key derived from a user
//! password, and keeps the time that secret material spends unencrypted in memory short.
//!
//! * [`SecureBuffer`]: single-owner byte container, wiped on release and on drop.
//! * [`kdf`]: iterated SHA-384 hash chain producing a 32-byte key and a 12-byte IV.
//! * [`calibrate`](calibrate::calibrate): picks an iteration count for a target wall-clock cost.
//! * [`Vault`]: the `Locked → Unlocked → Armed` state machine and the AEAD built on the
//!   decrypted master secret.
//!
//! ## Record Format
//!
//! The vault never touches storage itself. [`Vault::generate`] and
//! [`Vault::change_password`] hand back a [`VaultRecord`] with a fixed layout:
//!
//! ```text
//! [V(1)][ITERATIONS(4, LE)][SALT(12)][WRAPPED_SECRET(32)][TAG(16)]
//! ```
//!
//! ## Payload Format & Nonce Policy
//!
//! Caller payloads are encrypted with a **fresh random 96-bit nonce per call**, stored in the
//! payload itself:
//!
//! ```text
//! [V(1)][FLAGS(1)][NONCE(12)][CIPHERTEXT(N)][TAG(16)]
//! ```
//!
//! Random nonces are probabilistic. Rotate the master secret (generate a new vault) well
//! before 2³² payloads have been encrypted under one secret.
//!
//! ## Errors
//!
//! A wrong password and a corrupted record both surface as [`VaultError::Authentication`];
//! callers must not try to tell them apart.
//!
//! ## Examples
//!
//! ```rust
//! use coffer_vault::prelude::*;
//!
//! # fn main() -> Result<(), VaultError> {
//! let vault = Vault::<ChaCha>::builder().calibration(Calibration::Fixed(32)).build();
//! vault.generate(b"correct horse")?;
//!
//! let sealed = vault.encrypt_with_context(b"memo", b"account-7")?;
//! let opened = vault.decrypt_with_context(&sealed, b"account-7")?;
//! assert_eq!(opened.as_slice(), b"memo");
//!
//! vault.lock();
//! assert!(matches!(vault.encrypt(b"memo"), Err(VaultError::NotArmed { .. })));
//! # Ok(())
//! # }
//! ```

mod buffer;
mod builder;
pub mod calibrate;
mod encoding;
mod engine;
mod error;
pub mod kdf;
mod observer;
mod payload;
mod random;
mod record;
mod types;

pub use buffer::SecureBuffer;
pub use builder::VaultBuilder;
pub use calibrate::Calibration;
pub use encoding::Encoding;
pub use engine::Vault;
pub use error::{VaultError, VaultErrorExt};
pub use observer::{NoopObserver, TracingObserver, VaultEvent, VaultObserver};
pub use random::{OsRandom, RandomSource};
pub use record::{MIN_RECORD_LEN, Salt, VaultRecord};
pub use types::{KEY_LEN, SALT_LEN, TAG_LEN, VaultState, VaultStatus};

pub mod prelude {
    pub use crate::buffer::SecureBuffer;
    pub use crate::calibrate::Calibration;
    pub use crate::engine::Vault;
    pub use crate::error::{VaultError, VaultErrorExt};
    pub use crate::record::{Salt, VaultRecord};
    pub use crate::types::{Aes, ChaCha, VaultState};
}

pub mod algorithms {
    pub use crate::types::{Aes, ChaCha, VaultCipher};
}
