//! Auth Relay Library
//!
//! This library lets a native client (one that cannot take part in a
//! browser-based, cookie-driven OAuth dance) drive a NextAuth web OAuth flow
//! step by step. CSRF tokens, PKCE verifiers, and signed state cookies are
//! threaded between HTTP calls by the relay, while a platform prompt handles
//! the provider consent screen.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`cookie`] - Cookie names, `Set-Cookie` extraction, `Cookie` header building
//! - [`relay`] - The CSRF → sign-in → callback sequence, proxy and logout calls
//! - [`native`] - Authorization requests and the platform prompt seam
//! - [`providers`] - Web/native provider identity pairs
//! - [`session`] - Credential persistence and the session cache adapter

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cookie;
pub mod native;
pub mod providers;
pub mod relay;
pub mod session;
mod user_agent;

// Re-export commonly used types
pub use cookie::{
    CookieHeader, CookieOptions, CookieSet, CookieSpec, SameSite, csrf_token_from_cookie,
    extract_from_set_cookie_values, extract_set_cookie,
};
pub use native::{
    AuthorizationPrompt, AuthorizationRequest, BridgeError, ConsolePrompt, Discovery,
    NativeClient, PromptOutcome, broker_redirect_uri, parse_redirect,
};
pub use providers::{ProviderError, ProviderKind, ProviderPair, ProviderPairs, ResolvedProvider};
pub use relay::{
    AuthResult, CallbackCookiePolicy, CsrfToken, RelayClient, RelayConfig, RelayError,
    SignInSession, build_relay_http_client,
};
pub use session::{
    AuthClient, AuthError, CredentialStore, EncryptedFileStore, MemoryCredentialStore,
    RefreshEvent, SessionCache, SessionSnapshot, SessionStatus, SignInOutcome, StorageError,
    StoredCredentials,
};
