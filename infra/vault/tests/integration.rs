pub mod fixtures;

use coffer_vault::prelude::*;
use coffer_vault::{Encoding, TracingObserver};
use fixtures::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn cloned_handles_share_one_vault_across_threads() {
    let (vault, _) = generated_vault();

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let vault = vault.clone();
            thread::spawn(move || {
                for n in 0..32u8 {
                    let msg = [i, n];
                    let sealed = vault.encrypt(&msg).expect("encrypt failed");
                    assert_eq!(vault.decrypt(&sealed).expect("decrypt failed").as_slice(), &msg);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked");
    }
}

/// A vault whose KDF is slow enough for transitions to overlap, loaded and unlocked.
fn slow_unlocked_vault() -> Vault {
    let vault = Vault::<Aes>::builder().calibration(Calibration::Fixed(50_000)).build();
    let record = vault.generate(PASSWORD).expect("Vault generation failed");
    vault.load(record).unwrap();
    vault.unlock(PASSWORD).unwrap();
    vault
}

#[test]
fn concurrent_arms_install_exactly_once() {
    let vault = slow_unlocked_vault();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let vault = vault.clone();
            thread::spawn(move || vault.arm())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().expect("worker panicked")).collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 1, "exactly one arm must win: {results:?}");
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, VaultError::InvalidState { .. }), "{err}");
    }
    assert_eq!(vault.state(), VaultState::Armed);
}

#[test]
fn lock_during_arm_leaves_vault_locked() {
    let vault = slow_unlocked_vault();

    let arming = {
        let vault = vault.clone();
        thread::spawn(move || vault.arm())
    };
    thread::sleep(Duration::from_millis(5));
    vault.lock();

    let result = arming.join().expect("worker panicked");
    assert!(
        matches!(result, Ok(()) | Err(VaultError::InvalidState { .. })),
        "unexpected arm result: {result:?}"
    );
    assert_eq!(vault.state(), VaultState::Locked);
    assert_eq!(vault.status().secret_len, 0);
}

#[test]
fn status_stays_readable_while_generating() {
    let (vault, rng) = gated_vault();
    rng.gate_next();

    let generating = {
        let vault = vault.clone();
        thread::spawn(move || vault.generate(PASSWORD))
    };
    rng.wait_entered();

    let status = vault.status();
    assert_eq!(status.state, VaultState::Locked);
    assert!(!status.has_record);
    assert_eq!(status.secret_len, 0);

    rng.release();
    let record = generating.join().expect("worker panicked").unwrap();
    assert_eq!(vault.state(), VaultState::Armed);
    assert_eq!(vault.record(), Some(record));
}

#[test]
fn load_during_generate_wins() {
    let (_, donor_record) = generated_vault();
    let (vault, rng) = gated_vault();
    rng.gate_next();

    let generating = {
        let vault = vault.clone();
        thread::spawn(move || vault.generate(PASSWORD))
    };
    rng.wait_entered();
    vault.load(donor_record.clone()).unwrap();
    rng.release();

    let result = generating.join().expect("worker panicked");
    assert!(matches!(result, Err(VaultError::InvalidState { .. })), "{result:?}");
    assert_eq!(vault.state(), VaultState::Locked);
    assert_eq!(vault.record(), Some(donor_record));
}

#[test]
fn change_password_keeps_old_state_readable_and_yields_to_lock() {
    let (vault, rng) = gated_vault();
    let original = vault.generate(PASSWORD).unwrap();
    rng.gate_next();

    let changing = {
        let vault = vault.clone();
        thread::spawn(move || vault.change_password(b"new password"))
    };
    rng.wait_entered();

    assert_eq!(vault.state(), VaultState::Armed);
    assert_eq!(vault.record(), Some(original.clone()));
    vault.lock();
    rng.release();

    let result = changing.join().expect("worker panicked");
    assert!(matches!(result, Err(VaultError::InvalidState { .. })), "{result:?}");
    assert_eq!(vault.state(), VaultState::Locked);
    assert_eq!(vault.record(), Some(original));

    vault.unlock(PASSWORD).unwrap();
    vault.arm().unwrap();
}

#[test]
fn regenerate_replaces_previous_vault() {
    let (vault, first) = generated_vault();
    let sealed = vault.encrypt(b"old").unwrap();

    let second = vault.generate(b"another password").unwrap();
    assert_ne!(first.salt(), second.salt());
    assert!(vault.decrypt(&sealed).unwrap_err().is_authentication());
}

#[test]
fn tracing_observer_does_not_interfere() {
    let vault = Vault::<Aes>::builder()
        .calibration(Calibration::Fixed(ITERATIONS))
        .observer(Arc::new(TracingObserver))
        .build();

    vault.generate(PASSWORD).unwrap();
    vault.disarm().unwrap();
    assert!(vault.disarm().is_err());
    vault.arm().unwrap();
    assert_eq!(vault.state(), VaultState::Armed);
}

#[test]
fn salt_and_ciphertext_render_for_diagnostics() {
    let (_, record) = generated_vault();
    let salt_hex = Encoding::Hex.encode(record.salt().as_bytes());
    assert_eq!(salt_hex.len(), 24);

    let ct = SecureBuffer::from_bytes(record.ciphertext()).unwrap();
    let b64 = ct.to_encoded(Encoding::Base64);
    assert_eq!(Encoding::Base64.decode(&b64).unwrap(), record.ciphertext());
}
