//! P0: corrupted or foreign credential files fail cleanly without leaking data.

use std::env;
use std::fs;

use auth_relay::session::{MASTER_KEY_ENV, persisted_credentials_path};
use auth_relay::{CredentialStore, EncryptedFileStore, StorageError, StoredCredentials};
use tempfile::TempDir;

fn sample_credentials() -> StoredCredentials {
    StoredCredentials {
        session_token: Some("secret-session".to_string()),
        csrf_token_cookie: Some("secret-csrf".to_string()),
    }
}

#[test]
fn p0_corrupted_file_returns_error_not_panic() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("credentials.enc");
    fs::write(&path, b"invalid encrypted payload").expect("write");

    let err = EncryptedFileStore::with_key(&path, "corruption-key")
        .load()
        .expect_err("corrupted file must not load");
    assert!(
        matches!(err, StorageError::InvalidPayload | StorageError::DecryptionFailed),
        "unexpected error: {err:?}"
    );
}

#[test]
fn p0_truncated_file_fails_decryption() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("credentials.enc");
    let store = EncryptedFileStore::with_key(&path, "truncate-key");
    store.save(&sample_credentials()).expect("save");

    let bytes = fs::read(&path).expect("read");
    fs::write(&path, &bytes[..bytes.len() - 4]).expect("truncate");

    let err = store.load().expect_err("truncated file must not load");
    assert!(matches!(
        err,
        StorageError::InvalidPayload | StorageError::DecryptionFailed
    ));
    assert!(!err.to_string().contains("secret"));
}

#[test]
fn p0_wrong_key_does_not_leak_plaintext() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("credentials.enc");
    EncryptedFileStore::with_key(&path, "key-one")
        .save(&sample_credentials())
        .expect("save");

    let err = EncryptedFileStore::with_key(&path, "key-two")
        .load()
        .expect_err("wrong key must fail");
    assert!(matches!(err, StorageError::DecryptionFailed));
    assert!(!err.to_string().contains("secret"));
}

#[test]
#[ignore] // mutates XDG_CONFIG_HOME and the master key env var; run with --ignored
fn p0_default_store_round_trips_with_master_key() {
    let temp_dir = TempDir::new().expect("temp dir");
    // SAFETY: test isolation; we restore vars at end
    unsafe {
        env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        env::set_var(MASTER_KEY_ENV, "roundtrip-key");
    }

    let store = EncryptedFileStore::open_default().expect("default store");
    let saved = store.save(&sample_credentials());
    let loaded = store.load();
    let expected_path = persisted_credentials_path();
    let cleared = store.clear();

    unsafe {
        env::remove_var("XDG_CONFIG_HOME");
        env::remove_var(MASTER_KEY_ENV);
    }

    saved.expect("save");
    assert_eq!(loaded.expect("load"), sample_credentials());
    assert_eq!(
        expected_path.expect("path"),
        temp_dir.path().join("auth-relay").join("credentials.enc")
    );
    assert!(cleared.expect("clear"));
}
