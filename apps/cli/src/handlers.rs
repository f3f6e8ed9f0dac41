//! Subcommand implementations. Every handler is generic over the configured AEAD so the
//! dispatch in `main` is the only place that looks at `vault.cipher`.

use crate::args::Command;
use crate::secret::SecretReader;
use anyhow::{Context as _, Result, bail};
use coffer_kernel::domain::config::{CofferConfig, VaultConfig};
use coffer_kernel::store::{FileStore, RecordStore};
use coffer_vault::algorithms::VaultCipher;
use coffer_vault::calibrate::calibrate;
use coffer_vault::{Calibration, Encoding, OsRandom, TracingObserver, Vault};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Everything a subcommand needs besides its own arguments.
#[derive(Debug)]
pub(crate) struct Session<R> {
    pub(crate) config: CofferConfig,
    pub(crate) store: FileStore,
    pub(crate) password_env: String,
    pub(crate) secrets: SecretReader<R>,
}

pub(crate) fn dispatch<C, R>(
    command: Command,
    session: &mut Session<R>,
    out: &mut impl Write,
) -> Result<()>
where
    C: VaultCipher,
    R: BufRead,
{
    match command {
        Command::Init { force } => init::<C, R>(session, force, out),
        Command::Info {} => info(session, out),
        Command::Encrypt { message, context, encoding } => {
            let vault = open::<C, R>(session)?;
            let sealed = vault.encrypt_with_context(message.as_bytes(), context.as_bytes())?;
            writeln!(out, "{}", encoding.encode(&sealed))?;
            Ok(())
        },
        Command::Decrypt { payload, context, encoding } => {
            let sealed = encoding.decode(payload.trim()).context("Malformed payload")?;
            let vault = open::<C, R>(session)?;
            let plaintext = vault
                .decrypt_with_context(&sealed, context.as_bytes())
                .context("Payload rejected: wrong vault, wrong context or tampered data")?;
            out.write_all(plaintext.as_slice())?;
            writeln!(out)?;
            Ok(())
        },
        Command::Passwd { new_password_env } => passwd::<C, R>(session, &new_password_env, out),
        Command::Calibrate { target_ms } => {
            let target = target_ms
                .map_or_else(|| session.config.vault.calibration_target(), Duration::from_millis);
            let started = Instant::now();
            let iterations = calibrate(target, &OsRandom)?;
            info!(iterations, elapsed = ?started.elapsed(), "Calibration finished");
            writeln!(out, "{iterations} iterations in {} ms", target.as_millis())?;
            Ok(())
        },
    }
}

fn build<C: VaultCipher>(config: &VaultConfig) -> Vault<C> {
    let calibration = config
        .iterations
        .map_or_else(|| Calibration::Target(config.calibration_target()), Calibration::Fixed);

    Vault::<C>::builder().calibration(calibration).observer(Arc::new(TracingObserver)).build()
}

/// Loads the stored record and takes the vault all the way to `Armed`.
fn open<C: VaultCipher, R: BufRead>(session: &mut Session<R>) -> Result<Vault<C>> {
    let record = session
        .store
        .load()
        .with_context(|| format!("No usable vault at {}", session.store.path().display()))?;
    let password = session.secrets.read(&session.password_env, "password")?;

    let vault = build::<C>(&session.config.vault);
    vault.load(record)?;
    vault.unlock(password.as_bytes())?;
    vault.arm().context("Unlock failed: wrong password, wrong cipher or corrupted record")?;
    Ok(vault)
}

fn init<C: VaultCipher, R: BufRead>(
    session: &mut Session<R>,
    force: bool,
    out: &mut impl Write,
) -> Result<()> {
    let path = session.store.path().display().to_string();
    if session.store.exists() && !force {
        bail!("A vault already exists at {path}; pass --force to replace it");
    }

    let password = session.secrets.read(&session.password_env, "password")?;
    let vault = build::<C>(&session.config.vault);
    let record = vault.generate(password.as_bytes())?;
    session.store.save(&record).with_context(|| format!("Failed to save vault to {path}"))?;

    writeln!(
        out,
        "Created {} vault at {path} ({} iterations)",
        session.config.vault.cipher,
        record.iterations()
    )?;
    Ok(())
}

fn info<R>(session: &Session<R>, out: &mut impl Write) -> Result<()> {
    let record = session
        .store
        .load()
        .with_context(|| format!("No usable vault at {}", session.store.path().display()))?;

    writeln!(out, "path:       {}", session.store.path().display())?;
    writeln!(out, "cipher:     {}", session.config.vault.cipher)?;
    writeln!(out, "iterations: {}", record.iterations())?;
    writeln!(out, "salt:       {}", Encoding::Hex.encode(record.salt().as_bytes()))?;
    writeln!(out, "ciphertext: {} bytes", record.ciphertext().len())?;
    Ok(())
}

fn passwd<C: VaultCipher, R: BufRead>(
    session: &mut Session<R>,
    new_password_env: &str,
    out: &mut impl Write,
) -> Result<()> {
    let vault = open::<C, R>(session)?;
    let new_password = session.secrets.read(new_password_env, "new password")?;

    let record = vault.change_password(new_password.as_bytes())?;
    session
        .store
        .save(&record)
        .with_context(|| format!("Failed to save vault to {}", session.store.path().display()))?;

    writeln!(out, "Password changed ({} iterations)", record.iterations())?;
    Ok(())
}
