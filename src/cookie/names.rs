//! Cookie names emitted by the upstream NextAuth session framework.
//!
//! The names must match byte-for-byte what the web app sets, otherwise
//! extraction from responses quietly returns nothing.

use std::fmt;
use std::sync::OnceLock;

const SECURE_PREFIX: &str = "__Secure-";
const HOST_PREFIX: &str = "__Host-";

const SESSION_TOKEN: &str = "next-auth.session-token";
const CALLBACK_URL: &str = "next-auth.callback-url";
const CSRF_TOKEN: &str = "next-auth.csrf-token";
const PKCE_CODE_VERIFIER: &str = "next-auth.pkce.code_verifier";
const STATE: &str = "next-auth.state";

static SECURE_COOKIES: OnceLock<CookieSet> = OnceLock::new();
static INSECURE_COOKIES: OnceLock<CookieSet> = OnceLock::new();

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    /// Returns the attribute value as written in a `Set-Cookie` header.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lax => "lax",
            Self::Strict => "strict",
            Self::None => "none",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes the upstream framework sets on each cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: &'static str,
    pub secure: bool,
}

impl CookieOptions {
    fn framework_default(secure: bool) -> Self {
        Self {
            http_only: true,
            same_site: SameSite::Lax,
            path: "/",
            secure,
        }
    }
}

/// A named cookie together with its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: String,
    pub options: CookieOptions,
}

impl CookieSpec {
    fn new(name: String, secure: bool) -> Self {
        Self {
            name,
            options: CookieOptions::framework_default(secure),
        }
    }

    /// Returns the cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The full set of cookies used during a sign-in attempt and afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSet {
    pub session_token: CookieSpec,
    pub callback_url: CookieSpec,
    pub csrf_token: CookieSpec,
    pub pkce_code_verifier: CookieSpec,
    pub state: CookieSpec,
}

impl CookieSet {
    /// Derives cookie names for the given security mode.
    ///
    /// Secure mode prefixes names with `__Secure-`; the CSRF cookie uses the
    /// stricter `__Host-` prefix instead.
    #[must_use]
    pub fn new(use_secure_cookies: bool) -> Self {
        let prefix = if use_secure_cookies { SECURE_PREFIX } else { "" };
        let csrf_prefix = if use_secure_cookies { HOST_PREFIX } else { "" };

        Self {
            session_token: CookieSpec::new(format!("{prefix}{SESSION_TOKEN}"), use_secure_cookies),
            callback_url: CookieSpec::new(format!("{prefix}{CALLBACK_URL}"), use_secure_cookies),
            csrf_token: CookieSpec::new(format!("{csrf_prefix}{CSRF_TOKEN}"), use_secure_cookies),
            pkce_code_verifier: CookieSpec::new(
                format!("{prefix}{PKCE_CODE_VERIFIER}"),
                use_secure_cookies,
            ),
            state: CookieSpec::new(format!("{prefix}{STATE}"), use_secure_cookies),
        }
    }

    /// Returns the process-wide cookie set for the given security mode.
    ///
    /// Names never change at runtime, so each mode is derived once.
    #[must_use]
    pub fn for_mode(use_secure_cookies: bool) -> &'static CookieSet {
        if use_secure_cookies {
            SECURE_COOKIES.get_or_init(|| Self::new(true))
        } else {
            INSECURE_COOKIES.get_or_init(|| Self::new(false))
        }
    }

    /// Iterates the cookie specs in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = &CookieSpec> {
        [
            &self.session_token,
            &self.callback_url,
            &self.csrf_token,
            &self.pkce_code_verifier,
            &self.state,
        ]
        .into_iter()
    }
}
