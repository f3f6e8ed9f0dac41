use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info};

/// Prefix of environment overrides (`COFFER__VAULT__ITERATIONS` maps to `vault.iterations`).
pub const ENV_PREFIX: &str = "COFFER";

/// Base name probed in the working directory when no explicit file is given.
pub const DEFAULT_FILE: &str = "coffer";

/// Custom error type for config loading.
#[coffer_derive::coffer_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// This function implements a layered configuration strategy:
/// 1. **Defaults**: Fields missing from every source fall back to `T`'s serde defaults.
/// 2. **Base File**: An explicit `path` must exist. Without one, `coffer.{toml,json,yaml,...}`
///    in the working directory is used when present and silently skipped otherwise.
/// 3. **Environment Overrides**: Variables prefixed with `COFFER__` win over the file.
///    Nested structures use double underscores (`COFFER__LOG__LEVEL` maps to `log.level`).
///
/// # Errors
/// This function will return an error if:
/// * The explicitly requested configuration file cannot be found or parsed.
/// * A value (from the file or the environment) does not match the structure of `T`.
///
/// # Example
/// ```rust
/// use coffer_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local.toml")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let file = match &path {
        Some(path) => {
            info!("Loading config from {}", path.as_ref().display());
            File::from(path.as_ref()).required(true)
        },
        None => {
            debug!("Probing for optional config file '{DEFAULT_FILE}'");
            File::with_name(DEFAULT_FILE).required(false)
        },
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
