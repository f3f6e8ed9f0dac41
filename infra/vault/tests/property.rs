pub mod fixtures;

use coffer_vault::prelude::*;
use coffer_vault::KEY_LEN;
use coffer_vault::kdf::derive_key;
use fixtures::*;
use proptest::prelude::*;
use std::sync::OnceLock;

/// One generated vault shared by the round-trip cases; generation is the slow part.
fn shared_vault() -> &'static Vault<ChaCha> {
    static VAULT: OnceLock<Vault<ChaCha>> = OnceLock::new();
    VAULT.get_or_init(|| {
        let vault = Vault::<ChaCha>::builder().calibration(Calibration::Fixed(4)).build();
        vault.generate(PASSWORD).expect("Vault generation failed");
        vault
    })
}

#[derive(Debug, Clone)]
enum Op {
    Unlock(bool),
    Arm,
    Disarm,
    Lock,
    Encrypt(Vec<u8>),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Unlock),
        Just(Op::Arm),
        Just(Op::Disarm),
        Just(Op::Lock),
        proptest::collection::vec(any::<u8>(), 0..64).prop_map(Op::Encrypt),
    ]
}

proptest! {
    #[test]
    fn roundtrip_arbitrary_bytes(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        context in proptest::collection::vec(any::<u8>(), 0..32),
    ) {
        let vault = shared_vault();

        let sealed = vault.encrypt_with_context(&data, &context).unwrap();
        let opened = vault.decrypt_with_context(&sealed, &context).unwrap();
        prop_assert_eq!(opened.as_slice(), data.as_slice());
    }

    #[test]
    fn kdf_is_deterministic(
        password in proptest::collection::vec(any::<u8>(), 0..64),
        salt in any::<[u8; 12]>(),
        iterations in 1u32..8,
    ) {
        let salt = Salt::from_bytes(salt);
        let a = derive_key(&password, &salt, iterations).unwrap();
        let b = derive_key(&password, &salt, iterations).unwrap();
        prop_assert_eq!(a.key(), b.key());
        prop_assert_eq!(a.iv(), b.iv());
    }

    #[test]
    fn state_invariants_hold_for_any_sequence(ops in proptest::collection::vec(op(), 1..24)) {
        let vault = Vault::<Aes>::builder().calibration(Calibration::Fixed(2)).build();
        let record = vault.generate(PASSWORD).unwrap();
        vault.load(record).unwrap();

        for op in ops {
            match op {
                Op::Unlock(correct) => {
                    let pw: &[u8] = if correct { PASSWORD } else { b"wrong" };
                    let _ = vault.unlock(pw);
                },
                Op::Arm => {
                    if let Err(e) = vault.arm() {
                        prop_assert!(
                            matches!(e, VaultError::InvalidState { .. } | VaultError::Authentication { .. }),
                            "unexpected arm error: {}", e
                        );
                    }
                },
                Op::Disarm => {
                    let _ = vault.disarm();
                    prop_assert_eq!(vault.status().secret_len, 0);
                },
                Op::Lock => {
                    vault.lock();
                    prop_assert_eq!(vault.status().password_len, 0);
                },
                Op::Encrypt(data) => match vault.encrypt(&data) {
                    Ok(sealed) => {
                        let opened = vault.decrypt(&sealed).unwrap();
                        prop_assert_eq!(opened.as_slice(), data.as_slice());
                    },
                    Err(e) => prop_assert!(matches!(e, VaultError::NotArmed { .. }), "unexpected error: {:?}", e),
                },
            }

            let status = vault.status();
            if status.state.is_armed() {
                prop_assert!(status.state.is_unlocked());
                prop_assert!(status.has_cipher);
                prop_assert_eq!(status.secret_len, KEY_LEN);
            } else {
                prop_assert!(!status.has_cipher);
                prop_assert_eq!(status.secret_len, 0);
            }
            if !status.state.is_unlocked() {
                prop_assert_eq!(status.password_len, 0);
            }
            prop_assert!(status.has_record);
        }
    }
}
