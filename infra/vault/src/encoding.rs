use crate::error::VaultError;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use std::fmt;
use std::str::FromStr;

/// Text renderings for non-secret bytes (salt, ciphertext, payloads).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Lowercase hexadecimal.
    #[default]
    Hex,
    /// Standard base64 with padding.
    Base64,
    /// URL-safe base64 without padding.
    Base64Url,
    /// Space-separated decimal byte values, e.g. `"1 2 255"`.
    Decimal,
}

impl Encoding {
    #[must_use]
    pub fn encode(self, bytes: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(bytes),
            Self::Base64 => STANDARD.encode(bytes),
            Self::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
            Self::Decimal => {
                bytes.iter().map(u8::to_string).collect::<Vec<_>>().join(" ")
            },
        }
    }

    /// Parses text produced by [`Encoding::encode`].
    ///
    /// # Errors
    /// [`VaultError::InvalidInput`] when `text` is not valid for this encoding.
    pub fn decode(self, text: &str) -> Result<Vec<u8>, VaultError> {
        let text = text.trim();
        let decoded = match self {
            Self::Hex => hex::decode(text).map_err(|e| e.to_string()),
            Self::Base64 => STANDARD.decode(text).map_err(|e| e.to_string()),
            Self::Base64Url => URL_SAFE_NO_PAD.decode(text).map_err(|e| e.to_string()),
            Self::Decimal => text
                .split_whitespace()
                .map(|n| n.parse::<u8>().map_err(|e| format!("'{n}': {e}")))
                .collect(),
        };

        decoded.map_err(|e| VaultError::InvalidInput {
            message: e.into(),
            context: Some(format!("Decoding {self}").into()),
        })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hex => "hex",
            Self::Base64 => "base64",
            Self::Base64Url => "base64url",
            Self::Decimal => "decimal",
        })
    }
}

impl FromStr for Encoding {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            "base64url" => Ok(Self::Base64Url),
            "decimal" | "dec" => Ok(Self::Decimal),
            other => Err(VaultError::invalid_input(format!("Unknown encoding '{other}'"))),
        }
    }
}
