use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PASSWORD: &str = "correct horse";

/// A `coffer` invocation isolated in `dir`, with a cheap KDF and no inherited overrides.
fn coffer(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_coffer"));
    cmd.current_dir(dir)
        .env_remove("COFFER_PASSWORD")
        .env_remove("COFFER_NEW_PASSWORD")
        .env_remove("COFFER__VAULT__CIPHER")
        .env_remove("COFFER__STORE__PATH")
        .env_remove("RUST_LOG")
        .env("COFFER__VAULT__ITERATIONS", "8");
    cmd
}

fn init_vault(dir: &TempDir) -> PathBuf {
    coffer(dir.path())
        .arg("init")
        .env("COFFER_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout(predicate::str::contains("(8 iterations)"));
    dir.path().join("coffer.vault")
}

fn encrypt(dir: &TempDir, message: &str) -> String {
    let output = coffer(dir.path())
        .args(["encrypt", message])
        .env("COFFER_PASSWORD", PASSWORD)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap().trim().to_owned()
}

#[test]
fn init_encrypt_decrypt_round_trip() {
    let dir = TempDir::new().unwrap();
    let record = init_vault(&dir);
    assert!(record.is_file());

    let payload = encrypt(&dir, "secret-memo");

    coffer(dir.path())
        .args(["decrypt", &payload])
        .write_stdin(format!("{PASSWORD}\n"))
        .assert()
        .success()
        .stdout("secret-memo\n");
}

#[test]
fn wrong_password_is_rejected() {
    let dir = TempDir::new().unwrap();
    init_vault(&dir);
    let payload = encrypt(&dir, "secret-memo");

    coffer(dir.path())
        .args(["decrypt", &payload])
        .env("COFFER_PASSWORD", "battery staple")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    init_vault(&dir);

    coffer(dir.path())
        .arg("init")
        .env("COFFER_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    coffer(dir.path()).args(["init", "--force"]).env("COFFER_PASSWORD", PASSWORD).assert().success();
}

#[test]
fn info_needs_no_password() {
    let dir = TempDir::new().unwrap();
    init_vault(&dir);

    coffer(dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("iterations: 8"))
        .stdout(predicate::str::contains("cipher:     aes256gcm"))
        .stdout(predicate::str::contains("ciphertext: 48 bytes"));
}

#[test]
fn passwd_reads_both_passwords_from_stdin() {
    let dir = TempDir::new().unwrap();
    init_vault(&dir);
    let payload = encrypt(&dir, "kept");

    coffer(dir.path())
        .arg("passwd")
        .write_stdin(format!("{PASSWORD}\nbattery staple\n"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Password changed"));

    coffer(dir.path())
        .args(["decrypt", &payload])
        .env("COFFER_PASSWORD", "battery staple")
        .assert()
        .success()
        .stdout("kept\n");

    coffer(dir.path())
        .args(["decrypt", &payload])
        .env("COFFER_PASSWORD", PASSWORD)
        .assert()
        .failure();
}

#[test]
fn context_and_encoding_must_match() {
    let dir = TempDir::new().unwrap();
    init_vault(&dir);

    let output = coffer(dir.path())
        .args(["encrypt", "bound", "--context", "invoice-42", "--encoding", "hex"])
        .env("COFFER_PASSWORD", PASSWORD)
        .output()
        .unwrap();
    assert!(output.status.success());
    let payload = String::from_utf8(output.stdout).unwrap();
    assert!(payload.trim().chars().all(|c| c.is_ascii_hexdigit()));

    coffer(dir.path())
        .args(["decrypt", payload.trim(), "--context", "invoice-42", "-e", "hex"])
        .env("COFFER_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout("bound\n");

    coffer(dir.path())
        .args(["decrypt", payload.trim(), "--context", "invoice-43", "-e", "hex"])
        .env("COFFER_PASSWORD", PASSWORD)
        .assert()
        .failure();
}

#[test]
fn cipher_and_store_come_from_the_environment() {
    let dir = TempDir::new().unwrap();

    coffer(dir.path())
        .arg("init")
        .env("COFFER__VAULT__CIPHER", "chacha")
        .env("COFFER__STORE__PATH", "nested/chacha.vault")
        .env("COFFER_PASSWORD", PASSWORD)
        .assert()
        .success()
        .stdout(predicate::str::contains("chacha20poly1305"));
    assert!(dir.path().join("nested/chacha.vault").is_file());

    // Opening a ChaCha record with AES is indistinguishable from a wrong password.
    coffer(dir.path())
        .args(["--store", "nested/chacha.vault", "encrypt", "x"])
        .env("COFFER_PASSWORD", PASSWORD)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Authentication failed"));
}

#[test]
fn config_file_is_honoured() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("coffer.toml"), "[store]\npath = \"from-file.vault\"\n").unwrap();

    coffer(dir.path()).arg("init").env("COFFER_PASSWORD", PASSWORD).assert().success();
    assert!(dir.path().join("from-file.vault").is_file());
}

#[test]
fn missing_vault_is_reported() {
    let dir = TempDir::new().unwrap();

    coffer(dir.path())
        .arg("info")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No usable vault"));
}

#[test]
fn missing_password_is_reported() {
    let dir = TempDir::new().unwrap();

    coffer(dir.path())
        .arg("init")
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("COFFER_PASSWORD"));
}

#[test]
fn calibrate_reports_an_iteration_count() {
    let dir = TempDir::new().unwrap();

    coffer(dir.path())
        .args(["calibrate", "--target-ms", "20"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\d+ iterations in 20 ms\n$").unwrap());
}
