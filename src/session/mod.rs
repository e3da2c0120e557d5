//! Session persistence and the client-side session adapter.
//!
//! This module provides:
//! - [`CredentialStore`] backends (encrypted file, in-memory)
//! - [`SessionCache`] refresh bookkeeping
//! - [`AuthClient`], which drives sign-in/sign-out and publishes snapshots

mod cache;
mod client;
mod storage;

pub use cache::{CachedSession, RefreshEvent, SessionCache, SessionSnapshot, SessionStatus};
pub use client::{AuthClient, AuthError, SignInOutcome};
pub use storage::{
    CredentialStore, EncryptedFileStore, MASTER_KEY_ENV, MemoryCredentialStore, StorageError,
    StoredCredentials, default_config_dir, persisted_credentials_path,
};
