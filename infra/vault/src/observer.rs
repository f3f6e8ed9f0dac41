use crate::error::VaultError;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle events reported by a [`Vault`](crate::Vault).
///
/// Events never carry secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultEvent {
    Generated { iterations: u32 },
    Calibrated { iterations: u32, elapsed: Duration },
    Loaded { iterations: u32 },
    /// A persisted iteration count of zero was raised to one.
    IterationsClamped { persisted: u32 },
    Unlocked,
    Armed,
    Disarmed,
    Locked,
    PasswordChanged { iterations: u32 },
}

/// Receives vault events. Both methods default to doing nothing.
///
/// Callbacks run after the vault has released its internal lock, so an observer may call
/// back into the vault.
pub trait VaultObserver: Send + Sync + Debug {
    fn on_event(&self, _event: VaultEvent) {}

    fn on_error(&self, _operation: &'static str, _error: &VaultError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl VaultObserver for NoopObserver {}

/// Forwards events to `tracing` under the `coffer_vault` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl VaultObserver for TracingObserver {
    fn on_event(&self, event: VaultEvent) {
        match event {
            VaultEvent::Generated { iterations } => info!(iterations, "Vault generated"),
            VaultEvent::Calibrated { iterations, elapsed } => {
                debug!(iterations, elapsed_ms = elapsed.as_millis(), "KDF calibrated");
            },
            VaultEvent::Loaded { iterations } => debug!(iterations, "Vault record loaded"),
            VaultEvent::IterationsClamped { persisted } => {
                warn!(persisted, "Corrupt iteration count in record, clamped to 1");
            },
            VaultEvent::Unlocked => debug!("Vault unlocked"),
            VaultEvent::Armed => info!("Vault armed"),
            VaultEvent::Disarmed => debug!("Vault disarmed"),
            VaultEvent::Locked => debug!("Vault locked"),
            VaultEvent::PasswordChanged { iterations } => {
                info!(iterations, "Vault password changed");
            },
        }
    }

    fn on_error(&self, operation: &'static str, error: &VaultError) {
        warn!(operation, error = %error, "Vault operation failed");
    }
}
