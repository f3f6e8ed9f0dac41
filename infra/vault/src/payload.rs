//! AEAD plumbing shared by key wrapping and caller payloads.
//!
//! Caller payloads are self-describing:
//!
//! ```text
//! [V(1)][FLAGS(1)][NONCE(12)][CIPHERTEXT(N)][TAG(16)]
//! ```
//!
//! The two header bytes (plus any caller context) are authenticated as associated data, so a
//! flipped flag or version fails the tag check like any other tampering.

use crate::buffer::SecureBuffer;
use crate::error::VaultError;
use crate::kdf::derive_key;
use crate::random::RandomSource;
use crate::record::Salt;
use crate::types::{
    FLAG_CONTEXT, HEADER_LEN, KEY_LEN, KNOWN_FLAGS, NONCE_LEN, PAYLOAD_VERSION_V1, TAG_LEN,
    VaultCipher,
};
use aead::inout::InOutBuf;
use aead::{Key, Nonce, Tag};
use zeroize::Zeroize;

/// Builds a cipher from raw key bytes, wiping the intermediate key array.
pub(crate) fn init_cipher<C: VaultCipher>(bytes: &[u8]) -> Result<C, VaultError> {
    let mut key = Key::<C>::try_from(bytes).map_err(|_| VaultError::InvalidInput {
        message: format!("Invalid key length {}, must be {KEY_LEN} bytes", bytes.len()).into(),
        context: None,
    })?;
    let cipher = C::new(&key);
    key.as_mut_slice().zeroize();
    Ok(cipher)
}

/// Encrypts the master secret under a KEK derived from `password`.
///
/// The salt doubles as the nonce: it is fresh for every wrap and the KEK is bound to it. The
/// derived IV is authenticated as associated data.
pub(crate) fn wrap_secret<C: VaultCipher>(
    password: &[u8],
    salt: &Salt,
    iterations: u32,
    secret: &SecureBuffer,
) -> Result<Vec<u8>, VaultError> {
    let km = derive_key(password, salt, iterations)?;
    let cipher = init_cipher::<C>(km.key())?;
    let nonce = nonce_from::<C>(salt.as_bytes())?;

    let mut work = SecureBuffer::from_buffer(secret)?;
    let tag = seal_in_place(&cipher, &nonce, km.iv(), work.as_mut_slice())?;

    let mut out = Vec::with_capacity(work.len() + tag.len());
    out.extend_from_slice(work.as_slice());
    out.extend_from_slice(&tag);
    Ok(out)
}

/// Recovers the master secret from a wrapped ciphertext.
///
/// A wrong password and a corrupted ciphertext both yield [`VaultError::Authentication`].
pub(crate) fn unwrap_secret<C: VaultCipher>(
    password: &[u8],
    salt: &Salt,
    iterations: u32,
    wrapped: &[u8],
) -> Result<SecureBuffer, VaultError> {
    let km = derive_key(password, salt, iterations)?;
    let cipher = init_cipher::<C>(km.key())?;
    open(&cipher, salt.as_bytes(), km.iv(), wrapped)
}

/// Encrypts a caller payload with a fresh random nonce.
pub(crate) fn encrypt_payload<C: VaultCipher>(
    cipher: &C,
    rng: &dyn RandomSource,
    plaintext: &[u8],
    context: &[u8],
) -> Result<Vec<u8>, VaultError> {
    let mut nonce = Nonce::<C>::default();
    rng.fill(&mut nonce)?;

    let flags = if context.is_empty() { 0 } else { FLAG_CONTEXT };
    let header = [PAYLOAD_VERSION_V1, flags];
    let aad = [header.as_slice(), context].concat();

    let mut work = SecureBuffer::from_bytes(plaintext)?;
    let tag = seal_in_place(cipher, &nonce, &aad, work.as_mut_slice())?;

    let mut out = Vec::with_capacity(HEADER_LEN + nonce.len() + work.len() + tag.len());
    out.extend_from_slice(&header);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(work.as_slice());
    out.extend_from_slice(&tag);
    Ok(out)
}

/// Decrypts a payload produced by [`encrypt_payload`].
pub(crate) fn decrypt_payload<C: VaultCipher>(
    cipher: &C,
    blob: &[u8],
    context: &[u8],
) -> Result<SecureBuffer, VaultError> {
    if blob.len() < HEADER_LEN + NONCE_LEN + TAG_LEN {
        return Err(VaultError::InvalidPayload {
            message: format!(
                "Payload too short ({} bytes). Expected at least {} bytes",
                blob.len(),
                HEADER_LEN + NONCE_LEN + TAG_LEN
            )
            .into(),
            context: None,
        });
    }

    let (header, rest) = blob.split_at(HEADER_LEN);
    let (version, flags) = (header[0], header[1]);

    if version != PAYLOAD_VERSION_V1 {
        return Err(VaultError::InvalidPayload {
            message: "Unsupported payload version".into(),
            context: Some(format!("version={version}").into()),
        });
    }
    if flags & !KNOWN_FLAGS != 0 {
        return Err(VaultError::InvalidPayload {
            message: "Unknown payload flags".into(),
            context: Some(format!("flags={flags:#04x}").into()),
        });
    }

    let (nonce, sealed) = rest.split_at(NONCE_LEN);
    let aad = [header, context].concat();
    open(cipher, nonce, &aad, sealed)
}

fn nonce_from<C: VaultCipher>(bytes: &[u8]) -> Result<Nonce<C>, VaultError> {
    Nonce::<C>::try_from(bytes)
        .map_err(|_| VaultError::invalid_payload(format!("Invalid nonce length {}", bytes.len())))
}

fn seal_in_place<C: VaultCipher>(
    cipher: &C,
    nonce: &Nonce<C>,
    aad: &[u8],
    buf: &mut [u8],
) -> Result<Tag<C>, VaultError> {
    cipher.encrypt_inout_detached(nonce, aad, InOutBuf::from(buf)).map_err(|_| {
        VaultError::Encryption {
            message: "Encryption failed".into(),
            context: Some("AEAD encryption failed".into()),
        }
    })
}

fn open<C: VaultCipher>(
    cipher: &C,
    nonce: &[u8],
    aad: &[u8],
    sealed: &[u8],
) -> Result<SecureBuffer, VaultError> {
    if sealed.len() < TAG_LEN {
        return Err(VaultError::invalid_payload(format!(
            "Ciphertext too short ({} bytes)",
            sealed.len()
        )));
    }

    let nonce = nonce_from::<C>(nonce)?;
    let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
    let tag = Tag::<C>::try_from(tag)
        .map_err(|_| VaultError::invalid_payload(format!("Invalid tag length {}", tag.len())))?;

    let mut plain = SecureBuffer::from_bytes(ciphertext)?;
    cipher
        .decrypt_inout_detached(&nonce, aad, InOutBuf::from(plain.as_mut_slice()), &tag)
        .map_err(|_| VaultError::Authentication { context: None })?;

    Ok(plain)
}
