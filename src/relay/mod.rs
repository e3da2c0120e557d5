//! Relay client for the web app's auth surface.
//!
//! The sign-in sequence is strictly linear:
//! 1. [`RelayClient::fetch_csrf`] - CSRF token and cookie
//! 2. [`RelayClient::initiate_sign_in`] - authorization URL, state and PKCE cookies
//! 3. native authorization round-trip (see [`crate::native`])
//! 4. [`RelayClient::exchange_callback`] - session token or typed error
//!
//! [`RelayClient::proxy`] and [`RelayClient::logout`] reuse the same
//! cookie-forwarding discipline for calls made after sign-in.

mod client;
mod config;
mod error;
mod http_client;

pub use client::{AuthResult, CsrfToken, RelayClient, SignInSession};
pub use config::{
    CallbackCookiePolicy, DEFAULT_BASE_PATH, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_READ_TIMEOUT_SECS, RelayConfig,
};
pub use error::RelayError;
pub use http_client::build_relay_http_client;
