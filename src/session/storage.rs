//! Session credential persistence with encrypted-at-rest storage.
//!
//! The file store writes encrypted data to
//! `~/.config/auth-relay/credentials.enc` (or `$XDG_CONFIG_HOME/auth-relay/credentials.enc`).
//! Reads and writes are unsynchronized: one app instance is the only writer.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

const CREDENTIALS_FILE_NAME: &str = "credentials.enc";
const APP_DIR_NAME: &str = "auth-relay";
const KEYRING_SERVICE: &str = "auth-relay";
const KEYRING_ENTRY_NAME: &str = "session-master-key-v1";
/// Environment variable that supplies the master key instead of the keychain.
pub const MASTER_KEY_ENV: &str = "AUTH_RELAY_MASTER_KEY";
const MAGIC: &[u8; 4] = b"ARC1";
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

/// Errors for persisted credential storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No suitable user config directory is available.
    #[error("unable to determine config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigDirUnavailable,
    /// Filesystem I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Could not access keychain and no env fallback key was provided.
    #[error(
        "unable to access system keychain for credential encryption key; set AUTH_RELAY_MASTER_KEY or configure keychain access"
    )]
    KeychainUnavailable,
    /// Stored encrypted payload is malformed.
    #[error("persisted credential payload is invalid")]
    InvalidPayload,
    /// Encryption failed.
    #[error("failed to encrypt persisted credentials")]
    EncryptionFailed,
    /// Decryption failed.
    #[error("failed to decrypt persisted credentials")]
    DecryptionFailed,
    /// In-memory store lock was poisoned by a panicking writer.
    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Credentials kept between app launches.
///
/// Values are sensitive; `Debug` output reports presence only.
#[derive(Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoredCredentials {
    pub session_token: Option<String>,
    pub csrf_token_cookie: Option<String>,
}

impl StoredCredentials {
    /// Returns `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.session_token.is_none() && self.csrf_token_cookie.is_none()
    }
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "csrf_token_cookie",
                &self.csrf_token_cookie.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Persistence backend for session credentials.
///
/// The UI layer never reads cookies; it goes through the store.
pub trait CredentialStore: Send + Sync {
    /// Loads the stored credentials (empty when nothing was stored).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    fn load(&self) -> Result<StoredCredentials, StorageError>;

    /// Replaces the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError>;

    /// Removes all stored credentials. Returns `true` when something was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when removal fails.
    fn clear(&self) -> Result<bool, StorageError>;
}

/// Process-local store, for tests and embedders with their own persistence.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<StoredCredentials>,
}

impl MemoryCredentialStore {
    /// Creates a store pre-filled with credentials.
    #[must_use]
    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            inner: Mutex::new(credentials),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<StoredCredentials, StorageError> {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| StorageError::Poisoned)
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        let mut guard = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        *guard = credentials.clone();
        Ok(())
    }

    fn clear(&self) -> Result<bool, StorageError> {
        let mut guard = self.inner.lock().map_err(|_| StorageError::Poisoned)?;
        let had_data = !guard.is_empty();
        *guard = StoredCredentials::default();
        Ok(had_data)
    }
}

#[derive(Debug, Clone)]
enum KeySource {
    /// `AUTH_RELAY_MASTER_KEY`, falling back to the system keychain.
    System,
    Explicit(String),
}

/// Encrypted file store (XChaCha20-Poly1305, key from env or keychain).
#[derive(Debug, Clone)]
pub struct EncryptedFileStore {
    path: PathBuf,
    key: KeySource,
}

impl EncryptedFileStore {
    /// Store at the default location with the system key source.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir is found.
    pub fn open_default() -> Result<Self, StorageError> {
        Ok(Self {
            path: persisted_credentials_path()?,
            key: KeySource::System,
        })
    }

    /// Store at an explicit path with explicit key material.
    #[must_use]
    pub fn with_key(path: impl Into<PathBuf>, key_material: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: KeySource::Explicit(key_material.into()),
        }
    }

    /// Path of the encrypted file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-encrypts the stored credentials under a freshly generated key.
    ///
    /// A new key is only generated for keychain-held keys; env and explicit
    /// keys are reused with a fresh nonce. The new payload is written next to
    /// the file and renamed over it, so a failed write leaves the old file
    /// readable.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if loading, writing, or storing the key fails.
    pub fn rotate_key(&self) -> Result<(), StorageError> {
        let credentials = self.load()?;
        if credentials.is_empty() {
            return Ok(());
        }

        let current_key = self.key_material()?;
        let keychain_owned = self.uses_keychain();
        let next_key = if keychain_owned {
            generate_key_material()
        } else {
            current_key.clone()
        };

        let staging = staging_path(&self.path);
        if let Err(err) = store_credentials_with_key(&credentials, &staging, &next_key) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
        if keychain_owned && let Err(err) = store_keychain_key(&next_key) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
        if let Err(err) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            if keychain_owned {
                let _ = store_keychain_key(&current_key);
            }
            return Err(err.into());
        }

        debug!(path = %self.path.display(), "rotated credential key");
        Ok(())
    }

    fn uses_keychain(&self) -> bool {
        matches!(self.key, KeySource::System) && env::var_os(MASTER_KEY_ENV).is_none()
    }

    fn key_material(&self) -> Result<String, StorageError> {
        match &self.key {
            KeySource::System => load_or_create_key(),
            KeySource::Explicit(key) => Ok(key.clone()),
        }
    }
}

impl CredentialStore for EncryptedFileStore {
    fn load(&self) -> Result<StoredCredentials, StorageError> {
        if !self.path.exists() {
            return Ok(StoredCredentials::default());
        }
        let key = self.key_material()?;
        load_credentials_with_key(&self.path, &key)
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<(), StorageError> {
        let key = self.key_material()?;
        store_credentials_with_key(credentials, &self.path, &key)?;
        debug!(path = %self.path.display(), "persisted session credentials");
        Ok(())
    }

    fn clear(&self) -> Result<bool, StorageError> {
        let removed = if self.path.exists() {
            fs::remove_file(&self.path)?;
            true
        } else {
            false
        };

        if self.uses_keychain() {
            let _ = delete_keychain_key();
        }

        Ok(removed)
    }
}

/// Returns the default credentials path (`~/.config/auth-relay/credentials.enc`).
///
/// # Errors
///
/// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn persisted_credentials_path() -> Result<PathBuf, StorageError> {
    Ok(default_config_dir()?.join(CREDENTIALS_FILE_NAME))
}

/// Returns the default config directory (`~/.config/auth-relay`).
///
/// # Errors
///
/// Returns [`StorageError::ConfigDirUnavailable`] if no usable config dir is found.
pub fn default_config_dir() -> Result<PathBuf, StorageError> {
    resolve_config_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

fn resolve_config_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StorageError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }

    Err(StorageError::ConfigDirUnavailable)
}

fn load_or_create_key() -> Result<String, StorageError> {
    if let Some(from_env) = env::var_os(MASTER_KEY_ENV) {
        let key = from_env.to_string_lossy().trim().to_string();
        if !key.is_empty() {
            return Ok(key);
        }
    }

    let entry = safe_keyring_entry()?;

    match safe_keyring_get_password(&entry) {
        Ok(existing) if !existing.trim().is_empty() => Ok(existing),
        _ => {
            let generated = generate_key_material();
            safe_keyring_set_password(&entry, &generated)?;
            Ok(generated)
        }
    }
}

fn store_keychain_key(key_material: &str) -> Result<(), StorageError> {
    let entry = safe_keyring_entry()?;
    safe_keyring_set_password(&entry, key_material)
}

fn delete_keychain_key() -> Result<(), StorageError> {
    let entry = safe_keyring_entry()?;
    let _ = safe_keyring_delete_credential(&entry);
    Ok(())
}

fn safe_keyring_entry() -> Result<keyring::Entry, StorageError> {
    catch_unwind(|| keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY_NAME))
        .map_err(|_| StorageError::KeychainUnavailable)?
        .map_err(|_| StorageError::KeychainUnavailable)
}

fn safe_keyring_get_password(entry: &keyring::Entry) -> Result<String, StorageError> {
    catch_unwind(AssertUnwindSafe(|| entry.get_password()))
        .map_err(|_| StorageError::KeychainUnavailable)?
        .map_err(|_| StorageError::KeychainUnavailable)
}

fn safe_keyring_set_password(entry: &keyring::Entry, password: &str) -> Result<(), StorageError> {
    catch_unwind(AssertUnwindSafe(|| entry.set_password(password)))
        .map_err(|_| StorageError::KeychainUnavailable)?
        .map_err(|_| StorageError::KeychainUnavailable)
}

fn safe_keyring_delete_credential(entry: &keyring::Entry) -> Result<(), StorageError> {
    catch_unwind(AssertUnwindSafe(|| entry.delete_credential()))
        .map_err(|_| StorageError::KeychainUnavailable)?
        .map_err(|_| StorageError::KeychainUnavailable)
}

fn generate_key_material() -> String {
    let mut bytes = [0_u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

fn derive_key_bytes(key_material: &str) -> [u8; KEY_LEN] {
    let digest = Sha256::digest(key_material.as_bytes());
    let mut key = [0_u8; KEY_LEN];
    key.copy_from_slice(&digest[..KEY_LEN]);
    key
}

fn store_credentials_with_key(
    credentials: &StoredCredentials,
    path: &Path,
    key_material: &str,
) -> Result<(), StorageError> {
    let plaintext = serde_json::to_vec(credentials)?;
    let encrypted = encrypt_bytes(&plaintext, key_material)?;
    write_encrypted_payload(path, &encrypted)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from(CREDENTIALS_FILE_NAME), OsString::from);
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_encrypted_payload(path: &Path, payload: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, payload)?;
    set_owner_only_permissions(path)
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

fn load_credentials_with_key(
    path: &Path,
    key_material: &str,
) -> Result<StoredCredentials, StorageError> {
    let bytes = fs::read(path)?;
    let plaintext = decrypt_bytes(&bytes, key_material)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

fn encrypt_bytes(plaintext: &[u8], key_material: &str) -> Result<Vec<u8>, StorageError> {
    let key_bytes = derive_key_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));

    let mut nonce = [0_u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let nonce_ref = XNonce::from_slice(&nonce);

    let ciphertext = cipher
        .encrypt(nonce_ref, plaintext)
        .map_err(|_| StorageError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(MAGIC.len() + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(MAGIC);
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

fn decrypt_bytes(payload: &[u8], key_material: &str) -> Result<Vec<u8>, StorageError> {
    if payload.len() < MAGIC.len() + NONCE_LEN || &payload[..MAGIC.len()] != MAGIC {
        return Err(StorageError::InvalidPayload);
    }

    let key_bytes = derive_key_bytes(key_material);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key_bytes));
    let nonce_start = MAGIC.len();
    let nonce_end = nonce_start + NONCE_LEN;
    let nonce = XNonce::from_slice(&payload[nonce_start..nonce_end]);
    let ciphertext = &payload[nonce_end..];

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| StorageError::DecryptionFailed)
}
