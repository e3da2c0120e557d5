//! Relay endpoint configuration.

use url::Url;

use super::RelayError;

/// Default auth surface mount point on the web app.
pub const DEFAULT_BASE_PATH: &str = "/api/auth";
/// Default connect timeout for relay requests.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default overall request timeout for relay requests.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Which optional cookies are replayed on the callback request.
///
/// Revisions of the web app differ on whether the callback step needs the
/// callback-url cookie, so it is a switch rather than a fixed set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackCookiePolicy {
    /// Replay the callback-url cookie alongside CSRF, state and PKCE cookies.
    pub forward_callback_url: bool,
}

/// Where and how the relay talks to the web app.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Web app origin, e.g. `http://localhost:3000`.
    pub base_url: Url,
    /// Auth surface path under the origin.
    pub base_path: String,
    /// Explicit cookie security mode; derived from the scheme when `None`.
    pub use_secure_cookies: Option<bool>,
    /// `callbackUrl` sent on sign-out; defaults to the base URL.
    pub signout_callback_url: Option<String>,
    /// Cookies replayed on the callback request.
    pub callback_cookies: CallbackCookiePolicy,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Overall request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl RelayConfig {
    /// Creates a config for the given web app URL with default settings.
    ///
    /// A non-root path on `base_url` (e.g. `https://app.example.com/api/auth`)
    /// becomes the auth base path and only the origin is kept; a bare origin
    /// gets [`DEFAULT_BASE_PATH`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUrl`] when `base_url` is not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, RelayError> {
        let parsed = Url::parse(base_url).map_err(|_| RelayError::InvalidUrl {
            url: base_url.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.cannot_be_a_base() {
            return Err(RelayError::InvalidUrl {
                url: base_url.to_string(),
            });
        }

        let path = parsed.path().trim_end_matches('/');
        let base_path = if path.is_empty() {
            DEFAULT_BASE_PATH.to_string()
        } else {
            path.to_string()
        };
        let mut origin = parsed;
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self {
            base_url: origin,
            base_path,
            use_secure_cookies: None,
            signout_callback_url: None,
            callback_cookies: CallbackCookiePolicy::default(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        })
    }

    /// Whether secure cookie names are in effect.
    ///
    /// Follows the upstream default: secure when the site is served over https.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.use_secure_cookies
            .unwrap_or_else(|| self.base_url.scheme() == "https")
    }

    /// The `callbackUrl` used by sign-out.
    #[must_use]
    pub fn signout_callback_url(&self) -> String {
        self.signout_callback_url.clone().unwrap_or_else(|| {
            self.base_url
                .as_str()
                .trim_end_matches('/')
                .to_string()
        })
    }

    /// Builds the absolute URL for a path below the auth surface.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidUrl`] when the joined URL does not parse.
    pub fn endpoint(&self, path: &str) -> Result<Url, RelayError> {
        let origin = self.base_url.as_str().trim_end_matches('/');
        let base_path = self.base_path.trim_matches('/');
        let path = path.trim_start_matches('/');
        let raw = if base_path.is_empty() {
            format!("{origin}/{path}")
        } else {
            format!("{origin}/{base_path}/{path}")
        };
        Url::parse(&raw).map_err(|_| RelayError::InvalidUrl { url: raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_cookies_follow_scheme_by_default() {
        assert!(!RelayConfig::new("http://localhost:3000").unwrap().secure_cookies());
        assert!(RelayConfig::new("https://app.example.com").unwrap().secure_cookies());
    }

    #[test]
    fn test_explicit_secure_flag_wins() {
        let mut config = RelayConfig::new("https://app.example.com").unwrap();
        config.use_secure_cookies = Some(false);
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(
            RelayConfig::new("ftp://example.com"),
            Err(RelayError::InvalidUrl { .. })
        ));
        assert!(matches!(
            RelayConfig::new("not a url"),
            Err(RelayError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_endpoint_joins_base_path() {
        let config = RelayConfig::new("http://localhost:3000/").unwrap();
        assert_eq!(
            config.endpoint("csrf").unwrap().as_str(),
            "http://localhost:3000/api/auth/csrf"
        );
        assert_eq!(
            config.endpoint("/signin/github-expo").unwrap().as_str(),
            "http://localhost:3000/api/auth/signin/github-expo"
        );
    }

    #[test]
    fn test_base_url_path_becomes_base_path() {
        let config = RelayConfig::new("https://app.example.com/api/auth").unwrap();
        assert_eq!(config.base_url.as_str(), "https://app.example.com/");
        assert_eq!(config.base_path, "/api/auth");
        assert_eq!(
            config.endpoint("csrf").unwrap().as_str(),
            "https://app.example.com/api/auth/csrf"
        );
        assert_eq!(config.signout_callback_url(), "https://app.example.com");

        let custom = RelayConfig::new("https://app.example.com/auth/").unwrap();
        assert_eq!(
            custom.endpoint("session").unwrap().as_str(),
            "https://app.example.com/auth/session"
        );
    }

    #[test]
    fn test_endpoint_with_empty_base_path() {
        let mut config = RelayConfig::new("http://localhost:3000").unwrap();
        config.base_path = String::new();
        assert_eq!(
            config.endpoint("session").unwrap().as_str(),
            "http://localhost:3000/session"
        );
    }

    #[test]
    fn test_signout_callback_defaults_to_origin() {
        let config = RelayConfig::new("http://localhost:3000").unwrap();
        assert_eq!(config.signout_callback_url(), "http://localhost:3000");
    }
}
