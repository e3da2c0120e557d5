//! Mock web-app auth endpoints shared by the relay and session tests.

use auth_relay::{RelayClient, RelayConfig};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CSRF_TOKEN: &str = "csrf-token-value";
/// Raw cookie value as the web app sets it: `token|hash`, URL-encoded.
pub const CSRF_COOKIE: &str = "csrf-token-value%7Chash";
pub const STATE: &str = "state-123";
pub const STATE_COOKIE: &str = "encrypted-state";
pub const CODE_CHALLENGE: &str = "challenge-xyz";
pub const CODE_VERIFIER: &str = "encrypted-verifier";
pub const SESSION_TOKEN: &str = "session-abc";

/// Relay client against the mock server with insecure cookie names.
pub fn relay_for(server: &MockServer) -> RelayClient {
    RelayClient::new(RelayConfig::new(&server.uri()).expect("mock uri is http"))
        .expect("client builds")
}

/// Relay client against the mock server with `__Secure-`/`__Host-` names.
pub fn secure_relay_for(server: &MockServer) -> RelayClient {
    let mut config = RelayConfig::new(&server.uri()).expect("mock uri is http");
    config.use_secure_cookies = Some(true);
    RelayClient::new(config).expect("client builds")
}

pub async fn mount_csrf(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    format!("next-auth.csrf-token={CSRF_COOKIE}; Path=/; HttpOnly; SameSite=Lax")
                        .as_str(),
                )
                .set_body_json(json!({ "csrfToken": CSRF_TOKEN })),
        )
        .mount(server)
        .await;
}

/// Sign-in redirect to the provider, setting state and (optionally) PKCE cookies.
pub async fn mount_signin(server: &MockServer, provider: &str, with_pkce: bool) {
    let mut authorize = format!(
        "https://github.com/login/oauth/authorize?client_id=web&scope=read%3Auser&state={STATE}"
    );
    let mut template = ResponseTemplate::new(302).append_header(
        "set-cookie",
        format!("next-auth.state={STATE_COOKIE}; Path=/; HttpOnly; SameSite=Lax").as_str(),
    );
    if with_pkce {
        authorize.push_str(&format!(
            "&code_challenge={CODE_CHALLENGE}&code_challenge_method=S256"
        ));
        template = template.append_header(
            "set-cookie",
            format!("next-auth.pkce.code_verifier={CODE_VERIFIER}; Path=/; HttpOnly; SameSite=Lax")
                .as_str(),
        );
    }

    Mock::given(method("POST"))
        .and(path(format!("/api/auth/signin/{provider}")))
        .respond_with(template.insert_header("location", authorize.as_str()))
        .mount(server)
        .await;
}

/// Callback that redirects home and sets a session cookie.
pub async fn mount_callback_success(server: &MockServer, provider: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/api/auth/callback/{provider}")))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", "/")
                .append_header(
                    "set-cookie",
                    "next-auth.callback-url=http%3A%2F%2Flocalhost; Path=/; SameSite=Lax",
                )
                .append_header(
                    "set-cookie",
                    format!("next-auth.session-token={SESSION_TOKEN}; Path=/; HttpOnly; SameSite=Lax")
                        .as_str(),
                ),
        )
        .mount(server)
        .await;
}
