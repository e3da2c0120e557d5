//! Presentation-layer adapter over the relay client and credential store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::native::{AuthorizationPrompt, AuthorizationRequest, BridgeError, NativeClient, PromptOutcome};
use crate::providers::{ProviderError, ProviderPairs};
use crate::relay::{AuthResult, CsrfToken, RelayClient, RelayError};

use super::{CredentialStore, RefreshEvent, SessionCache, SessionSnapshot, StorageError};

/// Errors surfaced by [`AuthClient`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Sign-out was requested without a stored session token.
    #[error("no session token stored; sign in first")]
    NoSession,

    /// The provider has no native OAuth app registration.
    #[error("no native client configured for provider '{provider}'")]
    MissingNativeClient {
        /// Web provider id.
        provider: String,
    },
}

/// How a sign-in attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The callback exchange ran; see [`AuthResult`].
    Completed(AuthResult),
    /// The provider redirected with an error before any code was issued.
    ProviderError {
        error: String,
        description: Option<String>,
    },
    /// The user closed the prompt.
    Dismissed,
}

/// Session-aware client for the UI layer.
///
/// Owns the credential store and the session cache; observers subscribe to
/// snapshots instead of reading shared mutable state.
pub struct AuthClient<S: CredentialStore> {
    relay: RelayClient,
    store: S,
    providers: ProviderPairs,
    native_clients: HashMap<String, NativeClient>,
    redirect_uri: String,
    cache: Mutex<SessionCache>,
    updates: watch::Sender<SessionSnapshot>,
}

impl<S: CredentialStore> AuthClient<S> {
    /// Creates a client. `redirect_uri` is the broker URI the provider
    /// redirects to, also used as the sign-in `callbackUrl`.
    pub fn new(relay: RelayClient, store: S, redirect_uri: impl Into<String>) -> Self {
        let (updates, _) = watch::channel(SessionSnapshot::loading());
        Self {
            relay,
            store,
            providers: ProviderPairs::default(),
            native_clients: HashMap::new(),
            redirect_uri: redirect_uri.into(),
            cache: Mutex::new(SessionCache::new(None)),
            updates,
        }
    }

    /// Replaces the provider pairs.
    #[must_use]
    pub fn with_providers(mut self, providers: ProviderPairs) -> Self {
        self.providers = providers;
        self
    }

    /// Registers the native OAuth app for a web provider id.
    #[must_use]
    pub fn with_native_client(mut self, web_provider: impl Into<String>, client: NativeClient) -> Self {
        self.native_clients.insert(web_provider.into(), client);
        self
    }

    /// Treats a fetched session as stale after `stale_after` for focus/poll events.
    #[must_use]
    pub fn with_stale_after(self, stale_after: Duration) -> Self {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) =
            SessionCache::new(Some(stale_after));
        self
    }

    /// Underlying relay client.
    #[must_use]
    pub fn relay(&self) -> &RelayClient {
        &self.relay
    }

    /// Credential store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Provider pairs in effect.
    #[must_use]
    pub fn providers(&self) -> &ProviderPairs {
        &self.providers
    }

    /// Subscribes to session snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    /// Fetches a CSRF token and persists its cookie.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on relay or storage failure.
    pub async fn get_csrf_token(&self) -> Result<CsrfToken, AuthError> {
        let csrf = self.relay.fetch_csrf().await?;
        self.persist_csrf_cookie(&csrf.csrf_token_cookie)?;
        Ok(csrf)
    }

    /// Current session payload from the web app, `None` when signed out.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on relay or storage failure.
    pub async fn get_session(&self) -> Result<Option<Value>, AuthError> {
        self.fetch_data("session").await
    }

    /// Providers configured on the web app.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on relay or storage failure.
    pub async fn get_providers(&self) -> Result<Option<Value>, AuthError> {
        self.fetch_data("providers").await
    }

    /// Proxies a GET on the auth surface with the stored credentials.
    ///
    /// A CSRF cookie is fetched and persisted first when none is stored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] on relay or storage failure.
    pub async fn fetch_data(&self, path: &str) -> Result<Option<Value>, AuthError> {
        let credentials = self.store.load()?;
        let csrf_cookie = self.csrf_cookie(credentials.csrf_token_cookie).await?;
        Ok(self
            .relay
            .proxy(path, credentials.session_token.as_deref(), Some(&csrf_cookie))
            .await?)
    }

    /// Runs a full sign-in for a web provider through its native counterpart.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Provider`] for providers outside the pair map,
    /// [`AuthError::MissingNativeClient`] when no native app is registered, and
    /// relay, bridge, or storage errors from the individual steps.
    #[instrument(level = "debug", skip(self, prompt))]
    pub async fn sign_in(
        &self,
        web_provider: &str,
        prompt: &dyn AuthorizationPrompt,
    ) -> Result<SignInOutcome, AuthError> {
        let native_provider = self.providers.native_for(web_provider)?;
        let client = self
            .native_clients
            .get(web_provider)
            .cloned()
            .ok_or_else(|| AuthError::MissingNativeClient {
                provider: web_provider.to_string(),
            })?;

        let session = self
            .relay
            .start_sign_in(native_provider, &self.redirect_uri)
            .await?;
        self.persist_csrf_cookie(session.csrf_token_cookie())?;

        let request = AuthorizationRequest::for_session(client, self.redirect_uri.clone(), &session);
        let code = match prompt.prompt(&request).await? {
            PromptOutcome::Success { code } => code,
            PromptOutcome::Error { error, description } => {
                warn!(provider = web_provider, error = %error, "provider rejected authorization");
                return Ok(SignInOutcome::ProviderError { error, description });
            }
            PromptOutcome::Dismissed => {
                info!(provider = web_provider, "sign-in dismissed");
                return Ok(SignInOutcome::Dismissed);
            }
        };

        let result = self.relay.exchange_callback(session, &code).await?;
        if let AuthResult::SessionToken(token) = &result {
            let mut credentials = self.store.load()?;
            credentials.session_token = Some(token.clone());
            self.store.save(&credentials)?;
            info!(provider = web_provider, "signed in");
            self.refresh(RefreshEvent::Storage).await;
        }

        Ok(SignInOutcome::Completed(result))
    }

    /// Signs out and clears stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoSession`] when no session token is stored; relay
    /// failures leave the stored credentials untouched.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let credentials = self.store.load()?;
        let session_token = credentials.session_token.ok_or(AuthError::NoSession)?;
        let csrf_cookie = self.csrf_cookie(credentials.csrf_token_cookie).await?;

        self.relay.logout(&session_token, &csrf_cookie).await?;
        self.store.clear()?;
        self.refresh(RefreshEvent::Storage).await;
        Ok(())
    }

    /// Refreshes the cached session when `event` warrants it and publishes
    /// the resulting snapshot. Fetch failures are logged, not returned.
    pub async fn refresh(&self, event: RefreshEvent) -> SessionSnapshot {
        let needed = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .should_refetch(event, Instant::now());

        if needed {
            let fetched = self.get_session().await;
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            match fetched {
                Ok(session) => {
                    debug!(?event, present = session.is_some(), "session refreshed");
                    cache.record(session, Instant::now());
                }
                Err(err) => {
                    error!(?event, error = %err, "session refresh failed");
                    cache.finish_loading();
                }
            }
        } else {
            debug!(?event, "session refresh skipped");
            self.cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .finish_loading();
        }

        self.publish()
    }

    /// Drops the cached session, as when the UI tears the adapter down.
    pub fn reset(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
        self.publish();
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    async fn csrf_cookie(&self, stored: Option<String>) -> Result<String, AuthError> {
        match stored {
            Some(cookie) => Ok(cookie),
            None => Ok(self.get_csrf_token().await?.csrf_token_cookie),
        }
    }

    fn persist_csrf_cookie(&self, cookie: &str) -> Result<(), StorageError> {
        let mut credentials = self.store.load()?;
        credentials.csrf_token_cookie = Some(cookie.to_string());
        self.store.save(&credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayConfig;
    use crate::session::{MemoryCredentialStore, SessionStatus, StoredCredentials};

    fn client(store: MemoryCredentialStore) -> AuthClient<MemoryCredentialStore> {
        // Port 9 (discard) is never served; any network call fails fast.
        let relay = RelayClient::new(RelayConfig::new("http://127.0.0.1:9").unwrap()).unwrap();
        AuthClient::new(relay, store, "https://auth.expo.io/@owner/app")
    }

    struct NeverPrompt;

    #[async_trait::async_trait]
    impl AuthorizationPrompt for NeverPrompt {
        async fn prompt(&self, _: &AuthorizationRequest) -> Result<PromptOutcome, BridgeError> {
            panic!("prompt must not be reached");
        }
    }

    #[tokio::test]
    async fn test_sign_out_without_session_is_fatal() {
        let auth = client(MemoryCredentialStore::default());
        assert!(matches!(auth.sign_out().await, Err(AuthError::NoSession)));
    }

    #[tokio::test]
    async fn test_sign_in_rejects_unknown_provider_before_network() {
        let auth = client(MemoryCredentialStore::default());
        let result = auth.sign_in("gitlab", &NeverPrompt).await;
        assert!(matches!(
            result,
            Err(AuthError::Provider(ProviderError::Unknown { .. }))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_requires_native_client() {
        let auth = client(MemoryCredentialStore::default());
        let result = auth.sign_in("github", &NeverPrompt).await;
        assert!(matches!(result, Err(AuthError::MissingNativeClient { .. })));
    }

    #[tokio::test]
    async fn test_refresh_failure_publishes_unauthenticated() {
        let store = MemoryCredentialStore::with_credentials(StoredCredentials {
            session_token: Some("tok".to_string()),
            csrf_token_cookie: Some("csrf".to_string()),
        });
        let auth = client(store);
        let rx = auth.subscribe();
        assert_eq!(rx.borrow().status, SessionStatus::Loading);

        let snapshot = auth.refresh(RefreshEvent::Initial).await;
        assert_eq!(snapshot.status, SessionStatus::Unauthenticated);
        assert_eq!(rx.borrow().status, SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_reset_publishes_loading() {
        let auth = client(MemoryCredentialStore::default());
        auth.reset();
        assert_eq!(auth.snapshot().status, SessionStatus::Loading);
    }
}
