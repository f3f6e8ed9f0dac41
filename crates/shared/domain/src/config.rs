use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration of the `coffer` binary.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CofferConfig {
    pub vault: VaultConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

/// Key-derivation and cipher settings for new vaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Wall-clock cost of one password guess, used to calibrate the iteration count.
    pub calibration_ms: u64,
    /// Fixed iteration count; skips calibration when set.
    pub iterations: Option<u32>,
    pub cipher: CipherKind,
}

/// AEAD used for the vault. Records do not store it: a vault must be reopened with the same
/// cipher it was generated with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CipherKind {
    #[default]
    #[serde(rename = "aes256gcm", alias = "aes")]
    Aes256Gcm,
    #[serde(rename = "chacha20poly1305", alias = "chacha")]
    ChaCha20Poly1305,
}

/// Where the vault record lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level directive (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Write the file sink as JSON lines.
    pub json: bool,
    /// Directory for rolling log files; console only when unset.
    pub dir: Option<PathBuf>,
}

impl VaultConfig {
    #[must_use]
    pub const fn calibration_target(&self) -> Duration {
        Duration::from_millis(self.calibration_ms)
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Aes256Gcm => "aes256gcm",
            Self::ChaCha20Poly1305 => "chacha20poly1305",
        })
    }
}

// --- Default ---

impl Default for VaultConfig {
    fn default() -> Self {
        Self { calibration_ms: 1_000, iterations: None, cipher: CipherKind::default() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("coffer.vault") }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "warn".to_owned(), json: false, dir: None }
    }
}
