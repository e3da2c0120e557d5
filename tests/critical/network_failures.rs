//! P0: connection refusals, timeouts, and malformed bodies surface typed errors.

use std::time::Duration;

use auth_relay::{RelayClient, RelayConfig, RelayError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::support::socket_guard::start_mock_server_or_skip;

fn unreachable_relay() -> RelayClient {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    RelayClient::new(RelayConfig::new(&format!("http://127.0.0.1:{port}")).expect("config"))
        .expect("client")
}

#[tokio::test]
async fn p0_connection_refused_is_transport_error() {
    if crate::support::socket_guard::should_skip_socket_bound_test() {
        return;
    }
    let err = unreachable_relay().fetch_csrf().await.unwrap_err();
    assert!(matches!(err, RelayError::Transport { .. }), "{err:?}");
    assert!(!err.is_timeout());
}

#[tokio::test]
async fn p0_slow_upstream_times_out() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/auth/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_string("{}"),
        )
        .mount(&server)
        .await;

    let mut config = RelayConfig::new(&server.uri()).expect("config");
    config.read_timeout_secs = 1;
    let err = RelayClient::new(config)
        .expect("client")
        .proxy("session", None, None)
        .await
        .unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
}

#[tokio::test]
async fn p0_malformed_success_body_is_invalid_body() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/auth/providers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let relay = RelayClient::new(RelayConfig::new(&server.uri()).expect("config")).expect("client");
    let err = relay.proxy("providers", None, None).await.unwrap_err();
    assert!(matches!(err, RelayError::InvalidBody { .. }), "{err:?}");
}

#[tokio::test]
async fn p0_server_error_on_csrf_surfaces_status() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/auth/csrf"))
        .respond_with(ResponseTemplate::new(503).set_body_string(""))
        .mount(&server)
        .await;

    let relay = RelayClient::new(RelayConfig::new(&server.uri()).expect("config")).expect("client");
    let err = relay.fetch_csrf().await.unwrap_err();
    match err {
        RelayError::Upstream { status, body, .. } => {
            assert_eq!(status, 503);
            assert!(body.is_null());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
