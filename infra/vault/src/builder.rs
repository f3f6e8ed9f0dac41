use crate::calibrate::Calibration;
use crate::engine::{Vault, VaultInner, VaultShared};
use crate::observer::{NoopObserver, VaultObserver};
use crate::random::{OsRandom, RandomSource};
use crate::types::{Aes, VaultCipher};
use parking_lot::Mutex;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Configures a [`Vault`].
///
/// Defaults: one-second calibration target, [`NoopObserver`], [`OsRandom`].
pub struct VaultBuilder<C: VaultCipher = Aes> {
    _cipher: PhantomData<C>,
    calibration: Calibration,
    observer: Arc<dyn VaultObserver>,
    rng: Arc<dyn RandomSource>,
}

impl<C: VaultCipher> Default for VaultBuilder<C> {
    fn default() -> Self {
        Self {
            _cipher: PhantomData,
            calibration: Calibration::default(),
            observer: Arc::new(NoopObserver),
            rng: Arc::new(OsRandom),
        }
    }
}

impl<C: VaultCipher> fmt::Debug for VaultBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultBuilder")
            .field("calibration", &self.calibration)
            .field("observer", &self.observer)
            .field("rng", &self.rng)
            .finish()
    }
}

impl<C: VaultCipher> VaultBuilder<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How iteration counts are chosen by `generate` and `change_password`.
    #[must_use]
    pub const fn calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// Receives lifecycle events and operation failures.
    #[must_use]
    pub fn observer<O: VaultObserver + 'static>(mut self, observer: Arc<O>) -> Self {
        self.observer = observer;
        self
    }

    /// Replaces the OS RNG, e.g. with a deterministic or failing source in tests.
    #[must_use]
    pub fn random_source<R: RandomSource + 'static>(mut self, rng: Arc<R>) -> Self {
        self.rng = rng;
        self
    }

    /// Builds an empty, `Locked` vault.
    #[must_use]
    pub fn build(self) -> Vault<C> {
        Vault {
            inner: Arc::new(VaultShared {
                state: Mutex::new(VaultInner::new()),
                observer: self.observer,
                rng: self.rng,
                calibration: self.calibration,
            }),
        }
    }
}
