//! # CLI Argument Definitions
//!
//! Global flags pick the configuration file, the record path and where passwords come from;
//! every subcommand then operates on that single vault record.

use clap::{Parser, Subcommand};
use coffer_vault::Encoding;
use std::path::PathBuf;

/// Environment variable consulted for the vault password before falling back to stdin.
pub(crate) const PASSWORD_ENV: &str = "COFFER_PASSWORD";
/// Environment variable consulted for the replacement password of `passwd`.
pub(crate) const NEW_PASSWORD_ENV: &str = "COFFER_NEW_PASSWORD";

#[derive(Debug, Parser)]
#[command(name = "coffer")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "Password-protected master-secret vault")]
pub(crate) struct Cli {
    /// Configuration file (TOML, JSON or YAML). Defaults to `coffer.*` when present.
    #[arg(short, long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Vault record path, overriding `store.path`.
    #[arg(short, long, global = true)]
    pub(crate) store: Option<PathBuf>,

    /// Variable holding the password; its first stdin line is used when unset.
    #[arg(long, global = true, default_value = PASSWORD_ENV)]
    pub(crate) password_env: String,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Create a new vault and persist its record
    Init {
        /// Replace an existing record
        #[arg(short, long)]
        force: bool,
    },
    /// Show the public fields of the stored record
    Info {},
    /// Encrypt a message under the vault's master secret
    Encrypt {
        /// Plaintext (UTF-8)
        message: String,

        /// Associated data the payload is bound to
        #[arg(long, default_value = "")]
        context: String,

        /// Output encoding (hex, base64, base64url, decimal)
        #[arg(short, long, default_value = "base64")]
        encoding: Encoding,
    },
    /// Decrypt a payload produced by `encrypt`
    Decrypt {
        /// Encoded payload
        payload: String,

        /// Associated data given at encryption time
        #[arg(long, default_value = "")]
        context: String,

        /// Input encoding (hex, base64, base64url, decimal)
        #[arg(short, long, default_value = "base64")]
        encoding: Encoding,
    },
    /// Re-wrap the master secret under a new password
    Passwd {
        /// Variable holding the new password; the next stdin line is used when unset
        #[arg(long, default_value = NEW_PASSWORD_ENV)]
        new_password_env: String,
    },
    /// Measure how many KDF iterations fit into a time budget
    Calibrate {
        /// Target duration in milliseconds (defaults to `vault.calibration_ms`)
        #[arg(short, long)]
        target_ms: Option<u64>,
    },
}
