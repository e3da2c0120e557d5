//! Relay client: the CSRF → sign-in → callback sequence plus proxy and logout.

use std::fmt;

use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;
use url::form_urlencoded;

use crate::cookie::{CookieHeader, CookieSet, csrf_token_from_cookie, extract_set_cookie};

use super::{RelayConfig, RelayError, build_relay_http_client};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// CSRF token pair returned by the web app's CSRF endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken {
    /// Token to echo back in form bodies.
    pub csrf_token: String,
    /// Value of the CSRF cookie set by the same response.
    pub csrf_token_cookie: String,
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfToken")
            .field("csrf_token", &"[REDACTED]")
            .field("csrf_token_cookie", &"[REDACTED]")
            .finish()
    }
}

/// Ephemeral state of one sign-in attempt.
///
/// Produced by [`RelayClient::initiate_sign_in`] and consumed by value in
/// [`RelayClient::exchange_callback`], so it can only be replayed once.
/// Each attempt owns its own session; nothing is shared between attempts.
pub struct SignInSession {
    provider: String,
    callback_url: String,
    authorization_url: Url,
    state: Option<String>,
    state_cookie: Option<String>,
    csrf_token_cookie: String,
    code_verifier: Option<String>,
    code_challenge: Option<String>,
}

impl SignInSession {
    /// Provider id the sign-in was initiated for.
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Callback URL sent with the sign-in request.
    #[must_use]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    /// Authorization URL the web app redirected to.
    #[must_use]
    pub fn authorization_url(&self) -> &Url {
        &self.authorization_url
    }

    /// Plain `state` query parameter of the authorization URL.
    #[must_use]
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Encrypted state cookie value.
    #[must_use]
    pub fn state_cookie(&self) -> Option<&str> {
        self.state_cookie.as_deref()
    }

    /// CSRF cookie value carried from step 1.
    #[must_use]
    pub fn csrf_token_cookie(&self) -> &str {
        &self.csrf_token_cookie
    }

    /// PKCE verifier cookie value, when the provider uses PKCE.
    #[must_use]
    pub fn code_verifier(&self) -> Option<&str> {
        self.code_verifier.as_deref()
    }

    /// PKCE `code_challenge` query parameter, when the provider uses PKCE.
    #[must_use]
    pub fn code_challenge(&self) -> Option<&str> {
        self.code_challenge.as_deref()
    }
}

impl fmt::Debug for SignInSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInSession")
            .field("provider", &self.provider)
            .field("callback_url", &self.callback_url)
            .field("authorization_url", &self.authorization_url.as_str())
            .field("state", &self.state)
            .field("state_cookie", &self.state_cookie.as_ref().map(|_| "[REDACTED]"))
            .field("csrf_token_cookie", &"[REDACTED]")
            .field("code_verifier", &self.code_verifier.as_ref().map(|_| "[REDACTED]"))
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

/// Terminal value of a sign-in attempt.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// The callback set a session cookie.
    SessionToken(String),
    /// The callback succeeded without setting a session cookie
    /// (accounts were linked, nobody was logged in).
    Linked,
    /// The callback redirect carried an `error` query parameter,
    /// e.g. `OAuthAccountNotLinked`.
    Error(String),
}

impl AuthResult {
    /// Returns the session token on success.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        match self {
            Self::SessionToken(token) => Some(token),
            _ => None,
        }
    }

    /// Returns the upstream error code, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionToken(_) => f.write_str("SessionToken([REDACTED])"),
            Self::Linked => f.write_str("Linked"),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
        }
    }
}

#[derive(Deserialize)]
struct CsrfBody {
    #[serde(rename = "csrfToken")]
    csrf_token: String,
}

/// Client that threads auth cookies between calls to the web app.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    config: RelayConfig,
    cookies: &'static CookieSet,
}

impl RelayClient {
    /// Creates a client with the standard relay HTTP policy.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ClientBuild`] when the HTTP client cannot be built.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let http = build_relay_http_client(config.connect_timeout_secs, config.read_timeout_secs)?;
        Ok(Self::with_http_client(config, http))
    }

    /// Creates a client around an existing HTTP client.
    ///
    /// The client must not follow redirects.
    #[must_use]
    pub fn with_http_client(config: RelayConfig, http: Client) -> Self {
        let cookies = CookieSet::for_mode(config.secure_cookies());
        Self {
            http,
            config,
            cookies,
        }
    }

    /// Returns the relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Returns the cookie names in effect.
    #[must_use]
    pub fn cookie_names(&self) -> &'static CookieSet {
        self.cookies
    }

    /// Step 1: fetches a CSRF token and the matching CSRF cookie.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] on transport failure, a non-success status, a
    /// malformed body, or when the CSRF cookie was not set.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_csrf(&self) -> Result<CsrfToken, RelayError> {
        let url = self.config.endpoint("csrf")?;
        let response = send(self.http.get(url.clone()), &url).await?;
        let csrf_token_cookie = extract_set_cookie(&self.cookies.csrf_token.name, response.headers());
        let body = success_body(&url, response).await?;

        let parsed: CsrfBody =
            serde_json::from_value(body).map_err(|source| RelayError::InvalidBody {
                url: url.to_string(),
                source,
            })?;
        let csrf_token_cookie = csrf_token_cookie.ok_or_else(|| RelayError::MissingCookie {
            url: url.to_string(),
            name: self.cookies.csrf_token.name.clone(),
        })?;

        debug!("fetched CSRF token");
        Ok(CsrfToken {
            csrf_token: parsed.csrf_token,
            csrf_token_cookie,
        })
    }

    /// Steps 1 and 2 in one call.
    ///
    /// # Errors
    ///
    /// See [`RelayClient::fetch_csrf`] and [`RelayClient::initiate_sign_in`].
    pub async fn start_sign_in(
        &self,
        provider: &str,
        callback_url: &str,
    ) -> Result<SignInSession, RelayError> {
        let csrf = self.fetch_csrf().await?;
        self.initiate_sign_in(&csrf, provider, callback_url).await
    }

    /// Step 2: posts to the provider sign-in endpoint and captures the redirect.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingRedirect`] when no `Location` header comes
    /// back, [`RelayError::SignInRejected`] when it points at an error page, and
    /// [`RelayError::Upstream`] for error statuses.
    #[instrument(level = "debug", skip(self, csrf, callback_url), fields(provider = %provider))]
    pub async fn initiate_sign_in(
        &self,
        csrf: &CsrfToken,
        provider: &str,
        callback_url: &str,
    ) -> Result<SignInSession, RelayError> {
        let url = self.provider_endpoint("signin", provider)?;

        let cookie_header = CookieHeader::new()
            .with(self.cookies.csrf_token.name.as_str(), csrf.csrf_token_cookie.as_str())
            .with(self.cookies.callback_url.name.as_str(), callback_url);
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("csrfToken", &csrf.csrf_token)
            .append_pair("callbackUrl", callback_url)
            .finish();

        let request = with_cookies(self.http.post(url.clone()), &cookie_header)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body);
        let response = send(request, &url).await?;
        let response = reject_error_status(&url, response).await?;

        let authorization_url = self.redirect_location(&url, &response)?;
        if let Some(error) = query_param(&authorization_url, "error") {
            warn!(provider, error = %error, "sign-in redirected to error page");
            return Err(RelayError::SignInRejected { error });
        }

        let headers = response.headers();
        let session = SignInSession {
            provider: provider.to_string(),
            callback_url: callback_url.to_string(),
            state: query_param(&authorization_url, "state"),
            code_challenge: query_param(&authorization_url, "code_challenge"),
            state_cookie: extract_set_cookie(&self.cookies.state.name, headers),
            code_verifier: extract_set_cookie(&self.cookies.pkce_code_verifier.name, headers),
            csrf_token_cookie: csrf.csrf_token_cookie.clone(),
            authorization_url,
        };

        info!(
            provider,
            has_state = session.state.is_some(),
            pkce = session.code_verifier.is_some(),
            "sign-in initiated"
        );
        Ok(session)
    }

    /// Builds the `Cookie` header replayed on the callback request.
    ///
    /// CSRF always; callback-url when the policy asks for it; state and PKCE
    /// verifier only when the sign-in response set them.
    #[must_use]
    pub fn callback_cookie_header(&self, session: &SignInSession) -> CookieHeader {
        let mut header = CookieHeader::new().with(
            self.cookies.csrf_token.name.as_str(),
            session.csrf_token_cookie.as_str(),
        );
        if self.config.callback_cookies.forward_callback_url {
            header = header.with(
                self.cookies.callback_url.name.as_str(),
                session.callback_url.as_str(),
            );
        }
        header
            .with_optional(self.cookies.state.name.as_str(), session.state_cookie())
            .with_optional(
                self.cookies.pkce_code_verifier.name.as_str(),
                session.code_verifier(),
            )
    }

    /// Step 4: exchanges the authorization code through the web callback.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingRedirect`] when the callback response has
    /// no `Location` header; an `error` parameter on that location is not an
    /// error here but [`AuthResult::Error`].
    #[instrument(level = "debug", skip(self, session, code), fields(provider = %session.provider))]
    pub async fn exchange_callback(
        &self,
        session: SignInSession,
        code: &str,
    ) -> Result<AuthResult, RelayError> {
        let mut url = self.provider_endpoint("callback", &session.provider)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(state) = session.state() {
                query.append_pair("state", state);
            }
            query.append_pair("code", code);
        }

        let cookie_header = self.callback_cookie_header(&session);
        let response = send(with_cookies(self.http.get(url.clone()), &cookie_header), &url).await?;
        let response = reject_error_status(&url, response).await?;

        let location = self.redirect_location(&url, &response)?;
        if let Some(error) = query_param(&location, "error") {
            warn!(provider = %session.provider, error = %error, "callback returned error");
            return Ok(AuthResult::Error(error));
        }

        match extract_set_cookie(&self.cookies.session_token.name, response.headers()) {
            Some(token) => {
                info!(provider = %session.provider, "callback produced session token");
                Ok(AuthResult::SessionToken(token))
            }
            None => {
                info!(provider = %session.provider, "callback succeeded without session cookie");
                Ok(AuthResult::Linked)
            }
        }
    }

    /// Forwards a GET to an arbitrary path on the auth surface.
    ///
    /// Only the cookies supplied here are sent. A query string on `path` is
    /// forwarded. Returns `None` when the body is an empty object (or `null`).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Upstream`] carrying the parsed body for non-2xx
    /// statuses, and [`RelayError::InvalidProxyPath`] for paths that would
    /// leave the auth surface.
    #[instrument(level = "debug", skip(self, session_token, csrf_cookie))]
    pub async fn proxy(
        &self,
        path: &str,
        session_token: Option<&str>,
        csrf_cookie: Option<&str>,
    ) -> Result<Option<Value>, RelayError> {
        let url = self.config.endpoint(validate_proxy_path(path)?)?;
        let cookie_header = CookieHeader::new()
            .with_optional(self.cookies.session_token.name.as_str(), session_token)
            .with_optional(self.cookies.csrf_token.name.as_str(), csrf_cookie);

        let response = send(with_cookies(self.http.get(url.clone()), &cookie_header), &url).await?;
        let body = success_body(&url, response).await?;
        Ok(if is_empty_payload(&body) { None } else { Some(body) })
    }

    /// Signs out through the web app.
    ///
    /// The form `csrfToken` is derived from the CSRF cookie value.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Upstream`] carrying the parsed body for non-2xx
    /// statuses.
    #[instrument(level = "debug", skip(self, session_token, csrf_cookie))]
    pub async fn logout(&self, session_token: &str, csrf_cookie: &str) -> Result<bool, RelayError> {
        let url = self.config.endpoint("signout")?;
        let cookie_header = CookieHeader::new()
            .with(self.cookies.session_token.name.as_str(), session_token)
            .with(self.cookies.csrf_token.name.as_str(), csrf_cookie);
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("csrfToken", &csrf_token_from_cookie(csrf_cookie))
            .append_pair("callbackUrl", &self.config.signout_callback_url())
            .append_pair("json", "true")
            .finish();

        let request = with_cookies(self.http.post(url.clone()), &cookie_header)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body);
        let response = send(request, &url).await?;
        success_body(&url, response).await?;

        info!("signed out");
        Ok(true)
    }

    fn provider_endpoint(&self, action: &str, provider: &str) -> Result<Url, RelayError> {
        let valid = !provider.is_empty()
            && provider
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && provider != "."
            && provider != "..";
        if !valid {
            return Err(RelayError::InvalidUrl {
                url: format!("{action}/{provider}"),
            });
        }
        self.config.endpoint(&format!("{action}/{provider}"))
    }

    fn redirect_location(&self, url: &Url, response: &Response) -> Result<Url, RelayError> {
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RelayError::MissingRedirect {
                url: url.to_string(),
            })?;

        // Absolute locations replace the base; relative ones resolve against it.
        self.config
            .base_url
            .join(location)
            .map_err(|source| RelayError::InvalidRedirect {
                location: location.to_string(),
                source,
            })
    }
}

fn with_cookies(request: RequestBuilder, cookies: &CookieHeader) -> RequestBuilder {
    match cookies.to_header_value() {
        Some(value) => request.header(COOKIE, value),
        None => request,
    }
}

async fn send(request: RequestBuilder, url: &Url) -> Result<Response, RelayError> {
    let response = request
        .send()
        .await
        .map_err(|source| RelayError::transport(url.as_str(), source))?;
    debug!(url = %url, status = response.status().as_u16(), "relay response");
    Ok(response)
}

/// Passes redirects and successes through; turns 4xx/5xx into upstream errors.
async fn reject_error_status(url: &Url, response: Response) -> Result<Response, RelayError> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let (status, body) = read_body(url, response).await?;
        return Err(upstream(url, status, body));
    }
    Ok(response)
}

async fn success_body(url: &Url, response: Response) -> Result<Value, RelayError> {
    let (status, body) = read_body(url, response).await?;
    if !status.is_success() {
        return Err(upstream(url, status, body));
    }
    Ok(body)
}

async fn read_body(url: &Url, response: Response) -> Result<(StatusCode, Value), RelayError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|source| RelayError::transport(url.as_str(), source))?;

    if text.trim().is_empty() {
        return Ok((status, Value::Null));
    }
    match serde_json::from_str(&text) {
        Ok(value) => Ok((status, value)),
        Err(source) if status.is_success() => Err(RelayError::InvalidBody {
            url: url.to_string(),
            source,
        }),
        Err(_) => Ok((status, Value::String(text))),
    }
}

fn upstream(url: &Url, status: StatusCode, body: Value) -> RelayError {
    warn!(url = %url, status = status.as_u16(), "upstream returned error status");
    RelayError::Upstream {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    }
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn is_empty_payload(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Accepts plain relative paths below the auth surface.
/// A query string is kept as-is; only the path part must stay below the base path.
fn validate_proxy_path(path: &str) -> Result<&str, RelayError> {
    let trimmed = path.trim_start_matches('/');
    let route = trimmed.split_once('?').map_or(trimmed, |(route, _)| route);
    let invalid = route.is_empty()
        || path.starts_with("//")
        || route.contains("://")
        || route.contains('\\')
        || trimmed.contains('#')
        || route.split('/').any(|segment| segment == "..");
    if invalid {
        return Err(RelayError::InvalidProxyPath {
            path: path.to_string(),
        });
    }
    Ok(trimmed)
}
