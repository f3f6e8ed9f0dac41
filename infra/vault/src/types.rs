use aead::{AeadInOut, KeyInit};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::ZeroizeOnDrop;

// --- Aliases ---

pub type Aes = Aes256Gcm;
pub type ChaCha = ChaCha20Poly1305;

/// Any AEAD with a 32-byte key, a 96-bit nonce and a 128-bit tag.
///
/// The cipher holds the expanded master secret, so it must wipe itself on drop.
pub trait VaultCipher: AeadInOut + KeyInit + ZeroizeOnDrop + Send + Sync + 'static {}
impl<T: AeadInOut + KeyInit + ZeroizeOnDrop + Send + Sync + 'static> VaultCipher for T {}

// --- Sizes ---

/// SHA-384 digest length.
pub(crate) const DIGEST_LEN: usize = 48;

/// Length of the master secret and of the derived key-encryption-key.
pub const KEY_LEN: usize = 32;

/// Salt / derived IV / AEAD nonce length (96-bit).
pub const SALT_LEN: usize = 12;
pub(crate) const NONCE_LEN: usize = 12;

/// AEAD tag length (128-bit).
pub const TAG_LEN: usize = 16;

// --- Payload format constants ---

/// Payload header version for encrypted caller payloads.
pub(crate) const PAYLOAD_VERSION_V1: u8 = 1;

/// Header layout: `[version: u8][flags: u8]`
pub(crate) const HEADER_LEN: usize = 2;

/// Flag bit: caller-supplied associated data is bound into the tag.
pub(crate) const FLAG_CONTEXT: u8 = 1 << 0;

pub(crate) const KNOWN_FLAGS: u8 = FLAG_CONTEXT;

// --- State ---

/// Lifecycle state of a [`Vault`](crate::Vault).
///
/// `Armed` implies `Unlocked`: [`VaultState::is_unlocked`] is true for both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultState {
    #[default]
    Locked,
    Unlocked,
    Armed,
}

impl VaultState {
    #[must_use]
    pub const fn is_unlocked(self) -> bool {
        matches!(self, Self::Unlocked | Self::Armed)
    }

    #[must_use]
    pub const fn is_armed(self) -> bool {
        matches!(self, Self::Armed)
    }
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Armed => "armed",
        })
    }
}

/// Non-secret snapshot of a vault, for diagnostics and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStatus {
    pub state: VaultState,
    pub password_len: usize,
    pub secret_len: usize,
    pub has_cipher: bool,
    pub has_record: bool,
    pub iterations: Option<u32>,
}
