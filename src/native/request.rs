//! Provider authorization requests built from a relayed sign-in session.

use url::Url;

use crate::relay::SignInSession;

use super::BridgeError;

/// PKCE code challenge method used by the web app.
pub const CODE_CHALLENGE_METHOD_S256: &str = "S256";

/// Provider OAuth endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub revocation_endpoint: Option<String>,
}

impl Discovery {
    /// GitHub OAuth endpoints. The revocation page is per app, so it is only
    /// filled in by [`NativeClient::github`].
    #[must_use]
    pub fn github() -> Self {
        Self {
            authorization_endpoint: "https://github.com/login/oauth/authorize".to_string(),
            token_endpoint: "https://github.com/login/oauth/access_token".to_string(),
            revocation_endpoint: None,
        }
    }

    /// Discord OAuth endpoints.
    #[must_use]
    pub fn discord() -> Self {
        Self {
            authorization_endpoint: "https://discord.com/api/oauth2/authorize".to_string(),
            token_endpoint: "https://discord.com/api/oauth2/token".to_string(),
            revocation_endpoint: Some("https://discord.com/api/oauth2/token/revoke".to_string()),
        }
    }
}

/// A native OAuth app registration for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeClient {
    pub client_id: String,
    pub scopes: Vec<String>,
    pub discovery: Discovery,
}

impl NativeClient {
    /// GitHub native app with the scopes the web provider expects.
    #[must_use]
    pub fn github(client_id: impl Into<String>) -> Self {
        let client_id = client_id.into();
        let discovery = Discovery {
            revocation_endpoint: Some(format!(
                "https://github.com/settings/connections/applications/{client_id}"
            )),
            ..Discovery::github()
        };
        Self {
            client_id,
            scopes: ["read:user", "user:email", "openid"]
                .map(str::to_string)
                .to_vec(),
            discovery,
        }
    }

    /// Discord native app with identity and email scopes.
    #[must_use]
    pub fn discord(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scopes: ["identify", "email"].map(str::to_string).to_vec(),
            discovery: Discovery::discord(),
        }
    }
}

/// Authorization request handed to the platform prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub client: NativeClient,
    pub redirect_uri: String,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
}

impl AuthorizationRequest {
    /// Builds a request reusing the state and PKCE challenge the web app chose.
    #[must_use]
    pub fn for_session(
        client: NativeClient,
        redirect_uri: impl Into<String>,
        session: &SignInSession,
    ) -> Self {
        Self {
            client,
            redirect_uri: redirect_uri.into(),
            state: session.state().map(str::to_string),
            code_challenge: session.code_challenge().map(str::to_string),
        }
    }

    /// Provider authorization URL for this request.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidEndpoint`] when the configured
    /// authorization endpoint is not a URL.
    pub fn authorization_url(&self) -> Result<Url, BridgeError> {
        let endpoint = &self.client.discovery.authorization_endpoint;
        let mut url = Url::parse(endpoint).map_err(|_| BridgeError::InvalidEndpoint {
            endpoint: endpoint.clone(),
        })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client.client_id)
                .append_pair("redirect_uri", &self.redirect_uri);
            if !self.client.scopes.is_empty() {
                query.append_pair("scope", &self.client.scopes.join(" "));
            }
            if let Some(state) = &self.state {
                query.append_pair("state", state);
            }
            if let Some(challenge) = &self.code_challenge {
                query
                    .append_pair("code_challenge", challenge)
                    .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD_S256);
            }
        }

        Ok(url)
    }
}

/// Redirect URI served by an external OAuth broker for an app, `{broker}/@{owner}/{slug}`.
#[must_use]
pub fn broker_redirect_uri(broker_base: &str, owner: &str, slug: &str) -> String {
    format!("{}/@{owner}/{slug}", broker_base.trim_end_matches('/'))
}
