use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::buffer::SecureBuffer;
use crate::builder::VaultBuilder;
use crate::calibrate::Calibration;
use crate::error::VaultError;
use crate::observer::{VaultEvent, VaultObserver};
use crate::payload::{decrypt_payload, encrypt_payload, init_cipher, unwrap_secret, wrap_secret};
use crate::random::RandomSource;
use crate::record::{Salt, VaultRecord};
use crate::types::{Aes, KEY_LEN, TAG_LEN, VaultCipher, VaultState, VaultStatus};

/// Mutable vault state, guarded by one lock.
///
/// Invariants: `Armed ⇒ Unlocked`, a non-unlocked vault holds no password, and a non-armed
/// vault holds neither the secret nor a cipher.
pub(crate) struct VaultInner<C> {
    record: Option<VaultRecord>,
    password: SecureBuffer,
    secret: SecureBuffer,
    cipher: Option<C>,
    state: VaultState,
    /// Bumped on every transition; `arm` installs its result only if it is unchanged.
    epoch: u64,
}

impl<C> VaultInner<C> {
    pub(crate) const fn new() -> Self {
        Self {
            record: None,
            password: SecureBuffer::new(),
            secret: SecureBuffer::new(),
            cipher: None,
            state: VaultState::Locked,
            epoch: 0,
        }
    }

    fn disarm(&mut self) {
        self.secret.release();
        self.cipher = None;
        if self.state.is_armed() {
            self.state = VaultState::Unlocked;
        }
    }

    fn lock(&mut self) {
        self.disarm();
        self.password.release();
        self.state = VaultState::Locked;
    }

    fn reset(&mut self) {
        self.lock();
        self.record = None;
    }

    const fn bump(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn status(&self) -> VaultStatus {
        VaultStatus {
            state: self.state,
            password_len: self.password.len(),
            secret_len: self.secret.len(),
            has_cipher: self.cipher.is_some(),
            has_record: self.record.is_some(),
            iterations: self.record.as_ref().map(VaultRecord::iterations),
        }
    }
}

/// A generated vault waiting to be installed.
struct Populated<C> {
    record: VaultRecord,
    password: SecureBuffer,
    secret: SecureBuffer,
    cipher: C,
    calibrated: Option<Duration>,
}

pub(crate) struct VaultShared<C> {
    pub(crate) state: Mutex<VaultInner<C>>,
    pub(crate) observer: Arc<dyn VaultObserver>,
    pub(crate) rng: Arc<dyn RandomSource>,
    pub(crate) calibration: Calibration,
}

/// A password-protected master secret and the AEAD built on it.
///
/// ### Lifecycle
/// ```text
/// Locked --unlock--> Unlocked --arm--> Armed
///   ^                  ^  |              |
///   |                  |  +----lock------+--> Locked
///   +------lock--------+<-----disarm-----+
/// ```
/// `generate` works from any state and ends `Armed`; `load` ends `Locked`.
///
/// ### Concurrency
/// The handle is cheap to clone and `Send + Sync`. Every transition takes one exclusive
/// lock, held only to check out or install state. [`Vault::arm`], [`Vault::generate`] and
/// [`Vault::change_password`] run calibration and the KDF outside the lock, then install the
/// result only if no other transition happened in the meantime.
///
/// ### Example
/// ```rust
/// use coffer_vault::prelude::*;
///
/// # fn main() -> Result<(), VaultError> {
/// let vault = Vault::<Aes>::builder().calibration(Calibration::Fixed(16)).build();
/// let record = vault.generate(b"correct horse")?;
///
/// // Later, in another process:
/// let restored = Vault::<Aes>::builder().build();
/// restored.load(VaultRecord::from_bytes(&record.to_bytes())?)?;
/// restored.unlock(b"correct horse")?;
/// restored.arm()?;
///
/// let sealed = restored.encrypt(b"secret-memo")?;
/// assert_eq!(restored.decrypt(&sealed)?.as_slice(), b"secret-memo");
/// # Ok(())
/// # }
/// ```
pub struct Vault<C = Aes>
where
    C: VaultCipher,
{
    pub(crate) inner: Arc<VaultShared<C>>,
}

impl<C: VaultCipher> Clone for Vault<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: VaultCipher> Default for Vault<C> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<C: VaultCipher> fmt::Debug for Vault<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("Vault");
        match self.inner.state.try_lock() {
            Some(inner) => dbg.field("status", &inner.status()),
            None => dbg.field("status", &"<busy>"),
        };
        dbg.field("calibration", &self.inner.calibration)
            .field("observer", &self.inner.observer)
            .finish_non_exhaustive()
    }
}

impl<C> Vault<C>
where
    C: VaultCipher,
{
    /// Returns a new [`VaultBuilder`] to configure the vault.
    #[must_use]
    pub fn builder() -> VaultBuilder<C> {
        VaultBuilder::<C>::new()
    }

    /// Creates a fresh vault protected by `password`.
    ///
    /// Any previous state is released. A random 32-byte master secret is wrapped under a KEK
    /// derived from `password`, a random salt and a calibrated iteration count.
    ///
    /// # Results
    /// The new [`VaultRecord`] for the caller to persist. The vault ends `Armed`.
    ///
    /// # Errors
    /// * [`VaultError::InvalidInput`] for an empty password; the vault is left untouched.
    /// * [`VaultError::Generation`] wrapping the RNG, KDF or AEAD failure. The vault is then
    ///   `Locked`, holds no record and every buffer is empty.
    /// * [`VaultError::InvalidState`] when another transition happened while the KDF was
    ///   running; that transition's result is kept.
    pub fn generate(&self, password: &[u8]) -> Result<VaultRecord, VaultError> {
        let (record, calibrated) = self.report("generate", self.generate_unlocked(password))?;

        if let Some(elapsed) = calibrated {
            self.emit(VaultEvent::Calibrated { iterations: record.iterations(), elapsed });
        }
        self.emit(VaultEvent::Generated { iterations: record.iterations() });
        Ok(record)
    }

    /// Replaces the vault contents with a persisted record and locks the vault.
    ///
    /// A persisted iteration count of zero is treated as corrupt and raised to one.
    ///
    /// # Errors
    /// [`VaultError::InvalidPayload`] when the ciphertext cannot hold a tag plus a secret.
    pub fn load(&self, record: VaultRecord) -> Result<(), VaultError> {
        if record.ciphertext().len() <= TAG_LEN {
            let err = VaultError::invalid_payload(format!(
                "Ciphertext too short ({} bytes)",
                record.ciphertext().len()
            ));
            return self.report("load", Err(err));
        }

        let mut record = record;
        let persisted = record.iterations();
        if persisted == 0 {
            record.set_iterations(1);
        }
        let iterations = record.iterations();

        {
            let mut inner = self.lock_state();
            inner.reset();
            inner.record = Some(record);
            inner.bump();
        }

        if persisted == 0 {
            self.emit(VaultEvent::IterationsClamped { persisted });
        }
        self.emit(VaultEvent::Loaded { iterations });
        Ok(())
    }

    /// Stores the password. Cheap: no KDF runs until [`Vault::arm`].
    ///
    /// Calling it again while `Unlocked` replaces the password.
    ///
    /// # Errors
    /// * [`VaultError::InvalidInput`] for an empty password.
    /// * [`VaultError::InvalidState`] when the vault is `Armed`.
    pub fn unlock(&self, password: &[u8]) -> Result<(), VaultError> {
        let result = self.unlock_locked(password);
        self.report("unlock", result)?;
        self.emit(VaultEvent::Unlocked);
        Ok(())
    }

    /// Derives the KEK and decrypts the master secret.
    ///
    /// # Errors
    /// * [`VaultError::Authentication`] for a wrong password or corrupted record. The vault
    ///   stays `Unlocked`.
    /// * [`VaultError::InvalidState`] when not `Unlocked`, when no record is loaded, or when
    ///   another transition happened while the KDF was running.
    pub fn arm(&self) -> Result<(), VaultError> {
        let result = self.arm_unlocked();
        self.report("arm", result)?;
        self.emit(VaultEvent::Armed);
        Ok(())
    }

    /// Wipes the master secret and cipher; the password is kept.
    ///
    /// # Errors
    /// [`VaultError::NotArmed`] when the vault is not `Armed`.
    pub fn disarm(&self) -> Result<(), VaultError> {
        let result = {
            let mut inner = self.lock_state();
            if inner.state.is_armed() {
                inner.disarm();
                inner.bump();
                Ok(())
            } else {
                Err(VaultError::NotArmed { context: Some("disarm".into()) })
            }
        };
        self.report("disarm", result)?;
        self.emit(VaultEvent::Disarmed);
        Ok(())
    }

    /// Wipes the password, secret and cipher. The record is kept. Works from any state.
    pub fn lock(&self) {
        {
            let mut inner = self.lock_state();
            inner.lock();
            inner.bump();
        }
        self.emit(VaultEvent::Locked);
    }

    /// Encrypts `plaintext` under the master secret.
    ///
    /// Every call draws a fresh random nonce, stored in the payload header.
    ///
    /// # Errors
    /// * [`VaultError::NotArmed`] when the vault is not `Armed`.
    /// * [`VaultError::RandomSource`] / [`VaultError::Encryption`] from the nonce or AEAD.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        self.encrypt_with_context(plaintext, &[])
    }

    /// Like [`Vault::encrypt`], binding `context` into the tag as associated data.
    ///
    /// # Errors
    /// See [`Vault::encrypt`].
    pub fn encrypt_with_context(
        &self,
        plaintext: &[u8],
        context: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        let result = {
            let inner = self.lock_state();
            Self::armed_cipher(&inner)
                .and_then(|c| encrypt_payload(c, self.inner.rng.as_ref(), plaintext, context))
        };
        self.report("encrypt", result)
    }

    /// Decrypts a payload produced by [`Vault::encrypt`].
    ///
    /// # Errors
    /// * [`VaultError::NotArmed`] when the vault is not `Armed`.
    /// * [`VaultError::InvalidPayload`] for a truncated payload or unknown header.
    /// * [`VaultError::Authentication`] when the tag check fails.
    pub fn decrypt(&self, payload: &[u8]) -> Result<SecureBuffer, VaultError> {
        self.decrypt_with_context(payload, &[])
    }

    /// Decrypts a payload produced by [`Vault::encrypt_with_context`].
    ///
    /// # Errors
    /// See [`Vault::decrypt`]; a different `context` fails authentication.
    pub fn decrypt_with_context(
        &self,
        payload: &[u8],
        context: &[u8],
    ) -> Result<SecureBuffer, VaultError> {
        let result = {
            let inner = self.lock_state();
            Self::armed_cipher(&inner).and_then(|c| decrypt_payload(c, payload, context))
        };
        self.report("decrypt", result)
    }

    /// Re-wraps the master secret under `new_password` with a fresh salt and calibration.
    ///
    /// Payloads encrypted before the change stay decryptable.
    ///
    /// # Results
    /// The new [`VaultRecord`] to persist. The vault stays `Armed` with the new password.
    ///
    /// # Errors
    /// * [`VaultError::InvalidInput`] for an empty password.
    /// * [`VaultError::NotArmed`] when the vault is not `Armed`.
    /// * RNG, KDF or AEAD failures; the old record and password are then kept.
    /// * [`VaultError::InvalidState`] when another transition happened while the KDF was
    ///   running.
    pub fn change_password(&self, new_password: &[u8]) -> Result<VaultRecord, VaultError> {
        let result = self.change_password_unlocked(new_password);
        let record = self.report("change_password", result)?;
        self.emit(VaultEvent::PasswordChanged { iterations: record.iterations() });
        Ok(record)
    }

    /// A copy of the persisted record, if any.
    #[must_use]
    pub fn record(&self) -> Option<VaultRecord> {
        self.lock_state().record.clone()
    }

    /// A copy of the wrapped master secret, if any.
    #[must_use]
    pub fn ciphertext(&self) -> Option<Vec<u8>> {
        self.lock_state().record.as_ref().map(|r| r.ciphertext().to_vec())
    }

    #[must_use]
    pub fn salt(&self) -> Option<Salt> {
        self.lock_state().record.as_ref().map(VaultRecord::salt)
    }

    #[must_use]
    pub fn iterations(&self) -> Option<u32> {
        self.lock_state().record.as_ref().map(VaultRecord::iterations)
    }

    #[must_use]
    pub fn state(&self) -> VaultState {
        self.lock_state().state
    }

    #[must_use]
    pub fn status(&self) -> VaultStatus {
        self.lock_state().status()
    }

    fn generate_unlocked(
        &self,
        password: &[u8],
    ) -> Result<(VaultRecord, Option<Duration>), VaultError> {
        if password.is_empty() {
            return Err(VaultError::invalid_input("Password cannot be empty"));
        }

        let epoch = {
            let mut inner = self.lock_state();
            inner.reset();
            inner.bump();
            inner.epoch
        };

        let mut fresh = self
            .populate(password)
            .map_err(|source| VaultError::Generation { source: Box::new(source), context: None })?;

        let mut inner = self.lock_state();
        if inner.epoch != epoch {
            return Err(VaultError::InvalidState {
                message: "Vault changed while generating".into(),
                context: Some(format!("now {}", inner.state).into()),
            });
        }

        inner.password.move_from(&mut fresh.password);
        inner.secret.move_from(&mut fresh.secret);
        inner.cipher = Some(fresh.cipher);
        inner.record = Some(fresh.record.clone());
        inner.state = VaultState::Armed;
        inner.bump();
        Ok((fresh.record, fresh.calibrated))
    }

    /// Builds a complete armed vault without touching the shared state.
    fn populate(&self, password: &[u8]) -> Result<Populated<C>, VaultError> {
        let rng = self.inner.rng.as_ref();

        let secret = SecureBuffer::from_random(KEY_LEN, rng)?;
        let salt = Salt::generate(rng)?;
        let (iterations, calibrated) = self.resolve_iterations()?;

        let ciphertext = wrap_secret::<C>(password, &salt, iterations, &secret)?;
        let cipher = init_cipher::<C>(secret.as_slice())?;

        Ok(Populated {
            record: VaultRecord::new(ciphertext, salt, iterations),
            password: SecureBuffer::from_bytes(password)?,
            secret,
            cipher,
            calibrated,
        })
    }

    fn unlock_locked(&self, password: &[u8]) -> Result<(), VaultError> {
        if password.is_empty() {
            return Err(VaultError::invalid_input("Password cannot be empty"));
        }
        let mut password = SecureBuffer::from_bytes(password)?;

        let mut inner = self.lock_state();
        if inner.state.is_armed() {
            return Err(VaultError::invalid_state("Vault is armed; disarm or lock it first"));
        }

        inner.password.move_from(&mut password);
        inner.state = VaultState::Unlocked;
        inner.bump();
        Ok(())
    }

    fn arm_unlocked(&self) -> Result<(), VaultError> {
        let (password, record, epoch) = {
            let inner = self.lock_state();
            match inner.state {
                VaultState::Locked => {
                    return Err(VaultError::invalid_state("Vault is locked; unlock it first"));
                },
                VaultState::Armed => return Err(VaultError::invalid_state("Vault is already armed")),
                VaultState::Unlocked => {},
            }
            let record =
                inner.record.clone().ok_or_else(|| VaultError::invalid_state("No record loaded"))?;
            if inner.password.is_empty() {
                return Err(VaultError::invalid_state("No password set"));
            }
            (SecureBuffer::from_buffer(&inner.password)?, record, inner.epoch)
        };

        let mut secret = unwrap_secret::<C>(
            password.as_slice(),
            &record.salt(),
            record.iterations(),
            record.ciphertext(),
        )?;
        drop(password);

        if secret.len() != KEY_LEN {
            return Err(VaultError::invalid_payload(format!(
                "Master secret must be {KEY_LEN} bytes, got {}",
                secret.len()
            )));
        }
        let cipher = init_cipher::<C>(secret.as_slice())?;

        let mut inner = self.lock_state();
        if inner.epoch != epoch || inner.state != VaultState::Unlocked {
            return Err(VaultError::InvalidState {
                message: "Vault changed while arming".into(),
                context: Some(format!("now {}", inner.state).into()),
            });
        }

        inner.secret.move_from(&mut secret);
        inner.cipher = Some(cipher);
        inner.state = VaultState::Armed;
        inner.bump();
        Ok(())
    }

    fn change_password_unlocked(&self, new_password: &[u8]) -> Result<VaultRecord, VaultError> {
        if new_password.is_empty() {
            return Err(VaultError::invalid_input("Password cannot be empty"));
        }

        let (secret, epoch) = {
            let inner = self.lock_state();
            if !inner.state.is_armed() {
                return Err(VaultError::NotArmed { context: Some("change_password".into()) });
            }
            (SecureBuffer::from_buffer(&inner.secret)?, inner.epoch)
        };

        let salt = Salt::generate(self.inner.rng.as_ref())?;
        let (iterations, _) = self.resolve_iterations()?;
        let ciphertext = wrap_secret::<C>(new_password, &salt, iterations, &secret)?;
        drop(secret);
        let mut password = SecureBuffer::from_bytes(new_password)?;
        let record = VaultRecord::new(ciphertext, salt, iterations);

        let mut inner = self.lock_state();
        if inner.epoch != epoch || !inner.state.is_armed() {
            return Err(VaultError::InvalidState {
                message: "Vault changed while changing password".into(),
                context: Some(format!("now {}", inner.state).into()),
            });
        }

        inner.password.move_from(&mut password);
        inner.record = Some(record.clone());
        inner.bump();
        Ok(record)
    }

    fn resolve_iterations(&self) -> Result<(u32, Option<Duration>), VaultError> {
        let calibration = self.inner.calibration;
        let started = Instant::now();
        let iterations = calibration.resolve(self.inner.rng.as_ref())?;
        let elapsed = matches!(calibration, Calibration::Target(_)).then(|| started.elapsed());
        Ok((iterations, elapsed))
    }

    fn armed_cipher(inner: &VaultInner<C>) -> Result<&C, VaultError> {
        match (&inner.cipher, inner.state) {
            (Some(cipher), VaultState::Armed) => Ok(cipher),
            _ => Err(VaultError::NotArmed { context: None }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, VaultInner<C>> {
        self.inner.state.lock()
    }

    fn emit(&self, event: VaultEvent) {
        self.inner.observer.on_event(event);
    }

    fn report<T>(
        &self,
        operation: &'static str,
        result: Result<T, VaultError>,
    ) -> Result<T, VaultError> {
        if let Err(e) = &result {
            self.inner.observer.on_error(operation, e);
        }
        result
    }
}
