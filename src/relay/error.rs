//! Error types for the relay client.
//!
//! Every failure is surfaced to the caller; nothing here is retried.

use thiserror::Error;

/// Errors that can occur while relaying the web auth flow.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Network-level error (DNS resolution, connection refused, TLS, timeout).
    #[error("network error calling {url}: {source}")]
    Transport {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The web app answered with a non-success status; the body is the payload.
    #[error("HTTP {status} from {url}: {body}")]
    Upstream {
        /// The URL that returned the error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Parsed response body (a JSON string when the body was not JSON).
        body: serde_json::Value,
    },

    /// A redirect response carried no `Location` header.
    #[error("expected a redirect Location header from {url}")]
    MissingRedirect {
        /// The URL whose response violated the redirect contract.
        url: String,
    },

    /// The `Location` header could not be parsed as a URL.
    #[error("invalid redirect location '{location}': {source}")]
    InvalidRedirect {
        /// The raw header value.
        location: String,
        /// The parse failure.
        #[source]
        source: url::ParseError,
    },

    /// Sign-in initiation redirected to an error page instead of the provider.
    #[error("sign-in rejected by upstream: {error}")]
    SignInRejected {
        /// The `error` query parameter from the redirect.
        error: String,
    },

    /// A cookie the protocol depends on was not set by the response.
    #[error("response from {url} did not set cookie '{name}'")]
    MissingCookie {
        /// The URL that was called.
        url: String,
        /// The expected cookie name.
        name: String,
    },

    /// A successful response body was not the expected JSON.
    #[error("invalid response body from {url}: {source}")]
    InvalidBody {
        /// The URL that was called.
        url: String,
        /// The decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// Proxy path is not a plain relative path on the auth surface.
    #[error("invalid auth proxy path '{path}'")]
    InvalidProxyPath {
        /// The rejected path.
        path: String,
    },

    /// Endpoint URL could not be constructed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The offending URL text.
        url: String,
    },

    /// HTTP client construction failed.
    #[error("HTTP client construction failed: {reason}")]
    ClientBuild {
        /// Human-readable reason.
        reason: String,
    },
}

impl RelayError {
    /// Wraps a transport error for the given URL.
    #[must_use]
    pub fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    /// Returns `true` when the failure was a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    /// Returns the upstream error body, if this is an upstream status error.
    #[must_use]
    pub fn upstream_body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_includes_status_and_body() {
        let err = RelayError::Upstream {
            url: "http://localhost:3000/api/auth/session".to_string(),
            status: 403,
            body: serde_json::json!({"message": "forbidden"}),
        };
        let msg = err.to_string();
        assert!(msg.contains("HTTP 403"), "got: {msg}");
        assert!(msg.contains("forbidden"), "got: {msg}");
        assert_eq!(
            err.upstream_body(),
            Some(&serde_json::json!({"message": "forbidden"}))
        );
    }

    #[test]
    fn test_missing_redirect_display() {
        let err = RelayError::MissingRedirect {
            url: "http://x/api/auth/callback/github".to_string(),
        };
        assert!(err.to_string().contains("Location"));
        assert!(!err.is_timeout());
        assert!(err.upstream_body().is_none());
    }

    #[test]
    fn test_missing_cookie_names_cookie() {
        let err = RelayError::MissingCookie {
            url: "http://x/api/auth/csrf".to_string(),
            name: "next-auth.csrf-token".to_string(),
        };
        assert!(err.to_string().contains("next-auth.csrf-token"));
    }
}
