use coffer_vault::prelude::*;
use coffer_vault::{OsRandom, RandomSource, VaultEvent, VaultObserver};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

pub const PASSWORD: &[u8] = b"correct horse";
pub const ITERATIONS: u32 = 16;

/// Builds an empty vault with a small fixed iteration count.
#[must_use]
pub fn setup_vault() -> Vault {
    Vault::builder().calibration(Calibration::Fixed(ITERATIONS)).build()
}

/// Builds a vault and generates it with [`PASSWORD`].
/// # Panics
/// * If generation fails.
#[must_use]
pub fn generated_vault() -> (Vault, VaultRecord) {
    let vault = setup_vault();
    let record = vault.generate(PASSWORD).expect("Vault generation failed");
    (vault, record)
}

/// Collects every event and error the vault reports.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<VaultEvent>>,
    pub errors: Mutex<Vec<(&'static str, String)>>,
}

impl VaultObserver for RecordingObserver {
    fn on_event(&self, event: VaultEvent) {
        self.events.lock().push(event);
    }

    fn on_error(&self, operation: &'static str, error: &VaultError) {
        self.errors.lock().push((operation, error.to_string()));
    }
}

impl RecordingObserver {
    #[must_use]
    pub fn events(&self) -> Vec<VaultEvent> {
        self.events.lock().clone()
    }
}

/// A random source that always fails.
#[derive(Debug, Default)]
pub struct FailingRng;

impl RandomSource for FailingRng {
    fn fill(&self, _dest: &mut [u8]) -> Result<(), VaultError> {
        Err(VaultError::RandomSource { message: "entropy pool unplugged".into(), context: None })
    }
}

/// A random source that can park the next draw until the test releases it.
#[derive(Debug)]
pub struct GatedRng {
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl Default for GatedRng {
    fn default() -> Self {
        Self { armed: AtomicBool::new(false), entered: Barrier::new(2), release: Barrier::new(2) }
    }
}

impl GatedRng {
    /// Parks the next `fill` call.
    pub fn gate_next(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Blocks until a gated `fill` call is parked.
    pub fn wait_entered(&self) {
        self.entered.wait();
    }

    /// Lets the parked `fill` call continue.
    pub fn release(&self) {
        self.release.wait();
    }
}

impl RandomSource for GatedRng {
    fn fill(&self, dest: &mut [u8]) -> Result<(), VaultError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
        OsRandom.fill(dest)
    }
}

/// Builds a vault wired to a [`GatedRng`].
#[must_use]
pub fn gated_vault() -> (Vault, Arc<GatedRng>) {
    let rng = Arc::new(GatedRng::default());
    let vault = Vault::builder()
        .calibration(Calibration::Fixed(ITERATIONS))
        .random_source(Arc::clone(&rng))
        .build();
    (vault, rng)
}

/// Builds a vault wired to a [`RecordingObserver`].
#[must_use]
pub fn observed_vault() -> (Vault, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let vault = Vault::builder()
        .calibration(Calibration::Fixed(ITERATIONS))
        .observer(Arc::clone(&observer))
        .build();
    (vault, observer)
}
