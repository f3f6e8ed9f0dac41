//! # Vault Errors
//!
//! [`VaultError`] covers every failure of the buffer, KDF, calibration and vault lifecycle.
//!
//! Wrong passwords and corrupted ciphertexts both surface as
//! [`VaultError::Authentication`]; the two cases are never told apart.

use std::borrow::Cow;

/// A specialized [`VaultError`] enum for vault-related failures.
#[coffer_derive::coffer_error]
pub enum VaultError {
    /// Guarded memory for a [`SecureBuffer`](crate::SecureBuffer) could not be reserved.
    #[error("Allocation error{}: {message}", format_context(.context))]
    Allocation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The random source failed to produce bytes.
    #[error("Random source error{}: {message}", format_context(.context))]
    RandomSource { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Invalid iteration count or a failing hash primitive.
    #[error("Key derivation error{}: {message}", format_context(.context))]
    Kdf { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// `generate` failed; the vault was reset to `Locked`.
    #[error("Vault generation failed{}: {source}", format_context(.context))]
    Generation { source: Box<VaultError>, context: Option<Cow<'static, str>> },

    /// AEAD tag mismatch: wrong password or corrupted data.
    #[error("Authentication failed{}", format_context(.context))]
    Authentication { context: Option<Cow<'static, str>> },

    /// The operation requires an armed vault.
    #[error("Vault is not armed{}", format_context(.context))]
    NotArmed { context: Option<Cow<'static, str>> },

    /// The operation is not permitted from the current lifecycle state.
    #[error("Invalid vault state{}: {message}", format_context(.context))]
    InvalidState { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Caller-supplied input was rejected.
    #[error("Invalid input{}: {message}", format_context(.context))]
    InvalidInput { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A persisted record or an encrypted payload is malformed.
    #[error("Invalid payload{}: {message}", format_context(.context))]
    InvalidPayload { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Indexed buffer access outside `0..len`.
    #[error("Index {index} out of bounds for buffer of length {len}{}", format_context(.context))]
    OutOfBounds { index: usize, len: usize, context: Option<Cow<'static, str>> },

    /// The AEAD refused to encrypt (e.g. payload too large for the cipher).
    #[error("Encryption error{}: {message}", format_context(.context))]
    Encryption { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Internal fallback for unexpected issues or logic errors.
    #[error("Internal vault error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl VaultError {
    /// Returns `true` for [`VaultError::Authentication`], including when wrapped by
    /// [`VaultError::Generation`].
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Generation { source, .. } => source.is_authentication(),
            _ => false,
        }
    }

    pub(crate) fn invalid_state(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState { message: message.into(), context: None }
    }

    pub(crate) fn invalid_input(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidInput { message: message.into(), context: None }
    }

    pub(crate) fn invalid_payload(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidPayload { message: message.into(), context: None }
    }
}
