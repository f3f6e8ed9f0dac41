mod args;
mod handlers;
mod secret;

use crate::args::Cli;
use crate::handlers::{Session, dispatch};
use crate::secret::SecretReader;
use anyhow::{Context, Result};
use clap::Parser;
use coffer_kernel::config::load_config;
use coffer_kernel::domain::config::{CipherKind, CofferConfig, LogConfig};
use coffer_kernel::store::FileStore;
use coffer_logger::{LevelFilter, Logger};
use coffer_vault::prelude::{Aes, ChaCha};
use std::io::{self, IsTerminal};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config: CofferConfig =
        load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let _logger = init_logger(&config.log)?;

    let store = FileStore::new(cli.store.unwrap_or_else(|| config.store.path.clone()));
    let cipher = config.vault.cipher;
    let mut session = Session {
        config,
        store,
        password_env: cli.password_env,
        secrets: SecretReader::new(io::stdin().lock()),
    };
    let mut out = io::stdout().lock();

    match cipher {
        CipherKind::Aes256Gcm => dispatch::<Aes, _>(cli.command, &mut session, &mut out),
        CipherKind::ChaCha20Poly1305 => dispatch::<ChaCha, _>(cli.command, &mut session, &mut out),
    }
}

fn init_logger(log: &LogConfig) -> Result<Logger> {
    let level: LevelFilter =
        log.level.parse().with_context(|| format!("Invalid log level '{}'", log.level))?;

    let builder = Logger::builder()
        .name(env!("CARGO_BIN_NAME"))
        .console(true)
        .ansi(io::stderr().is_terminal())
        .level(level);

    let logger = match &log.dir {
        Some(dir) => builder.path(dir).json(log.json).init(),
        None => builder.init(),
    };
    Ok(logger?)
}
