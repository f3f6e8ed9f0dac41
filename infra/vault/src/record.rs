use crate::error::VaultError;
use crate::random::RandomSource;
use crate::types::{SALT_LEN, TAG_LEN};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record format version.
pub(crate) const RECORD_VERSION_V1: u8 = 1;

const ITERATIONS_LEN: usize = 4;
const RECORD_HEADER_LEN: usize = 1 + ITERATIONS_LEN + SALT_LEN;

/// Smallest valid record: header plus a tag-only ciphertext.
pub const MIN_RECORD_LEN: usize = RECORD_HEADER_LEN + TAG_LEN;

/// The 12-byte per-vault salt. Not secret.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Draws a fresh salt from `rng`.
    ///
    /// # Errors
    /// [`VaultError::RandomSource`] when the RNG fails.
    pub fn generate(rng: &dyn RandomSource) -> Result<Self, VaultError> {
        let mut salt = [0u8; SALT_LEN];
        rng.fill(&mut salt)?;
        Ok(Self(salt))
    }

    #[must_use]
    pub const fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Salt {
    type Error = VaultError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let salt: [u8; SALT_LEN] = bytes.try_into().map_err(|_| {
            VaultError::invalid_input(format!(
                "Salt must be exactly {SALT_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(salt))
    }
}

impl AsRef<[u8]> for Salt {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", hex::encode(self.0))
    }
}

/// The persisted triple: wrapped master secret, salt and iteration count.
///
/// Binary layout (`to_bytes` / `from_bytes`):
///
/// ```text
/// [V(1)][ITERATIONS(4, LE)][SALT(12)][CIPHERTEXT(N)]
/// ```
///
/// The ciphertext carries its 16-byte AEAD tag at the end.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    ciphertext: Vec<u8>,
    salt: Salt,
    iterations: u32,
}

impl VaultRecord {
    /// Builds a record from its persisted fields.
    ///
    /// No validation happens here; [`Vault::load`](crate::Vault::load) checks the fields.
    #[must_use]
    pub const fn new(ciphertext: Vec<u8>, salt: Salt, iterations: u32) -> Self {
        Self { ciphertext, salt, iterations }
    }

    #[must_use]
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    #[must_use]
    pub const fn salt(&self) -> Salt {
        self.salt
    }

    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    pub(crate) const fn set_iterations(&mut self, iterations: u32) {
        self.iterations = iterations;
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_HEADER_LEN + self.ciphertext.len());
        out.push(RECORD_VERSION_V1);
        out.extend_from_slice(&self.iterations.to_le_bytes());
        out.extend_from_slice(self.salt.as_bytes());
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parses the layout written by [`VaultRecord::to_bytes`].
    ///
    /// # Errors
    /// [`VaultError::InvalidPayload`] for short input or an unknown version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VaultError> {
        if bytes.len() < MIN_RECORD_LEN {
            return Err(VaultError::InvalidPayload {
                message: format!(
                    "Record too short ({} bytes). Expected at least {MIN_RECORD_LEN} bytes",
                    bytes.len()
                )
                .into(),
                context: None,
            });
        }

        let (version, rest) = bytes.split_at(1);
        if version[0] != RECORD_VERSION_V1 {
            return Err(VaultError::InvalidPayload {
                message: "Unsupported record version".into(),
                context: Some(format!("version={}", version[0]).into()),
            });
        }

        let (iterations, rest) = rest.split_at(ITERATIONS_LEN);
        let (salt, ciphertext) = rest.split_at(SALT_LEN);

        let iterations = iterations
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| VaultError::invalid_payload("Invalid iteration field"))?;

        Ok(Self { ciphertext: ciphertext.to_vec(), salt: Salt::try_from(salt)?, iterations })
    }
}

impl fmt::Debug for VaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultRecord")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("salt", &self.salt)
            .field("iterations", &self.iterations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn sample() -> VaultRecord {
        VaultRecord::new(vec![0xAB; 48], Salt::from_bytes(hex!("000102030405060708090a0b")), 300)
    }

    #[test]
    fn test_layout_is_fixed() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), 1 + 4 + 12 + 48);
        assert_eq!(bytes[0], RECORD_VERSION_V1);
        assert_eq!(&bytes[1..5], &hex!("2c010000"));
        assert_eq!(&bytes[5..17], &hex!("000102030405060708090a0b"));
        assert!(bytes[17..].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_parse_back() {
        let record = sample();
        assert_eq!(VaultRecord::from_bytes(&record.to_bytes()).unwrap(), record);
    }

    #[test]
    fn test_short_record_rejected() {
        let bytes = sample().to_bytes();
        let err = VaultRecord::from_bytes(&bytes[..MIN_RECORD_LEN - 1]).unwrap_err();
        assert!(matches!(err, VaultError::InvalidPayload { .. }));
        assert!(VaultRecord::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = sample().to_bytes();
        bytes[0] = 9;
        let err = VaultRecord::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, VaultError::InvalidPayload { .. }));
        assert_eq!(err.context_str(), Some("version=9"));
    }

    #[test]
    fn test_salt_length_checked() {
        assert!(Salt::try_from(&[0u8; 11][..]).is_err());
        assert!(Salt::try_from(&[0u8; 12][..]).is_ok());
    }

    #[test]
    fn test_debug_hides_ciphertext() {
        let out = format!("{:?}", sample());
        assert!(out.contains("ciphertext_len: 48"));
        assert!(out.contains("000102030405060708090a0b"));
    }

    #[test]
    fn test_serde_json() {
        let record = sample();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(serde_json::from_str::<VaultRecord>(&json).unwrap(), record);
    }
}
