//! Native authorization round-trip.
//!
//! The relay hands the `state` and `code_challenge` produced by the web app to
//! a platform prompt (browser, system auth session, or a console), which walks
//! the user through the provider's consent screen via a broker redirect URI and
//! returns an authorization code.

mod prompt;
mod request;

pub use prompt::{AuthorizationPrompt, ConsolePrompt, PromptOutcome, parse_redirect};
pub use request::{
    AuthorizationRequest, CODE_CHALLENGE_METHOD_S256, Discovery, NativeClient, broker_redirect_uri,
};

/// Errors raised by the native bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The redirect handed back by the platform is not a URL.
    #[error("invalid redirect URL '{url}'")]
    InvalidRedirect {
        /// The offending input.
        url: String,
    },

    /// The redirect's `state` does not match the one sent to the provider.
    #[error("state mismatch in authorization redirect")]
    StateMismatch,

    /// The redirect carried neither a `code` nor an `error`.
    #[error("authorization redirect carried neither code nor error")]
    MissingCode,

    /// The authorization URL could not be built.
    #[error("invalid authorization endpoint '{endpoint}'")]
    InvalidEndpoint {
        /// The configured endpoint.
        endpoint: String,
    },

    /// Reading from the platform primitive failed.
    #[error("authorization prompt failed: {0}")]
    Io(#[from] std::io::Error),
}
