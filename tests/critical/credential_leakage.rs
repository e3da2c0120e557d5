//! P0: secrets never reach Debug output, error messages, or request URLs.

use auth_relay::{AuthResult, CookieHeader, RelayError, StoredCredentials};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::support::relay_mocks::{
    CSRF_COOKIE, SESSION_TOKEN, mount_callback_success, mount_csrf, mount_signin, relay_for,
};
use crate::support::socket_guard::start_mock_server_or_skip;

#[test]
fn p0_stored_credentials_debug_is_redacted() {
    let credentials = StoredCredentials {
        session_token: Some("super-secret-session".to_string()),
        csrf_token_cookie: Some("super-secret-csrf".to_string()),
    };
    let debug = format!("{credentials:?}");
    assert!(!debug.contains("super-secret"), "{debug}");
}

#[test]
fn p0_auth_result_and_cookie_header_debug_are_redacted() {
    let result = AuthResult::SessionToken("super-secret-session".to_string());
    assert!(!format!("{result:?}").contains("super-secret"));

    let header = CookieHeader::new().with("next-auth.session-token", "super-secret-session");
    assert!(!format!("{header:?}").contains("super-secret"));
}

#[tokio::test]
async fn p0_sign_in_session_debug_is_redacted() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_csrf(&server).await;
    mount_signin(&server, "github-native", true).await;
    mount_callback_success(&server, "github-native").await;

    let relay = relay_for(&server);
    let session = relay
        .start_sign_in("github-native", "myapp://callback")
        .await
        .unwrap();
    let debug = format!("{session:?}");
    assert!(!debug.contains(CSRF_COOKIE), "{debug}");

    let csrf = relay.fetch_csrf().await.unwrap();
    assert!(!format!("{csrf:?}").contains(CSRF_COOKIE));

    let result = relay.exchange_callback(session, "abc").await.unwrap();
    assert!(!format!("{result:?}").contains(SESSION_TOKEN));
}

#[tokio::test]
async fn p0_cookies_travel_in_headers_not_urls() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/auth/session"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = relay_for(&server)
        .proxy("session", Some("super-secret-session"), Some("super-secret-csrf"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Upstream { status: 403, .. }));
    assert!(!err.to_string().contains("super-secret"));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.as_str().contains("super-secret"));
}
