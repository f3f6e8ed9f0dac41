//! # Record Store
//!
//! Persistence for [`VaultRecord`]s. The vault itself never touches the disk; callers hand the
//! record returned by `generate` / `change_password` to a [`RecordStore`] and feed it back
//! through `load` on the next start.
//!
//! [`FileStore`] writes the binary record layout atomically: a uniquely named temp file is
//! fully written and synced, then renamed over the target, so a crash leaves either the old
//! record or the new one and never a torn file.

use coffer_vault::{VaultError, VaultRecord};
use std::borrow::Cow;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// A specialized [`StoreError`] enum of this crate.
#[coffer_derive::coffer_error]
pub enum StoreError {
    #[error("Vault record not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Malformed vault record{}: {source}", format_context(.context))]
    Record { source: VaultError, context: Option<Cow<'static, str>> },
}

/// Somewhere a single vault record can be kept between runs.
pub trait RecordStore: Send + Sync {
    /// Reads and parses the stored record.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] when nothing was saved yet, [`StoreError::Record`] when the
    /// stored bytes are not a valid record.
    fn load(&self) -> Result<VaultRecord, StoreError>;

    /// Replaces the stored record.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the record could not be written durably.
    fn save(&self, record: &VaultRecord) -> Result<(), StoreError>;

    /// Whether a record has been saved.
    fn exists(&self) -> bool;
}

/// A [`RecordStore`] backed by one file on the local filesystem.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    tmp_counter: AtomicU64,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), tmp_counter: AtomicU64::new(0) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomic(&self, data: &[u8]) -> Result<(), StoreError> {
        let target = self.path.as_path();
        let parent = parent_dir(target);

        fs::create_dir_all(parent)
            .context(format!("Failed to create directory for {}", target.display()))?;

        let temp = unique_tmp_path(target, &self.tmp_counter);

        if let Err(err) = write_temp(&temp, data) {
            let _ = fs::remove_file(&temp);
            return Err(err);
        }

        if let Err(err) = fs::rename(&temp, target) {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(target)
                    .context(format!("Failed to replace existing file: {}", target.display()))?;
                fs::rename(&temp, target).context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    target.display()
                ))?;
            } else {
                let _ = fs::remove_file(&temp);
                return Err(StoreError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), target.display())
                            .into(),
                    ),
                });
            }
        }

        sync_dir(parent);

        debug!(path = %target.display(), bytes = data.len(), "Vault record saved atomically");
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn load(&self) -> Result<VaultRecord, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    message: self.path.display().to_string().into(),
                    context: None,
                });
            },
            Err(err) => {
                return Err(StoreError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", self.path.display()).into()),
                });
            },
        };

        let record = VaultRecord::from_bytes(&bytes)
            .context(format!("Parsing {}", self.path.display()))?;
        debug!(path = %self.path.display(), iterations = record.iterations(), "Vault record loaded");
        Ok(record)
    }

    fn save(&self, record: &VaultRecord) -> Result<(), StoreError> {
        self.write_atomic(&record.to_bytes())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

fn write_temp(temp: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(temp)
        .context(format!("Temp creation failed: {}", temp.display()))?;
    file.write_all(data).context("Write failed")?;
    file.sync_all().context("Hardware sync failed")
}

fn parent_dir(target: &Path) -> &Path {
    match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("vault");
    let tmp_name = format!("{file_name}.coffertmp.{}.{counter}", std::process::id());
    target.with_file_name(tmp_name)
}

fn sync_dir(path: &Path) {
    match fs::File::open(path) {
        Ok(dir) => {
            if let Err(err) = dir.sync_all() {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}
