//! HTTP client construction policy for relay requests.
//!
//! Relay calls must see raw 3xx responses (the `Location` header and the
//! cookies set alongside it), so redirects are never followed. Cookies are
//! threaded by hand; no cookie store is attached.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

use super::RelayError;

/// Builds the relay HTTP client.
///
/// # Errors
///
/// Returns [`RelayError::ClientBuild`] when client construction fails.
pub fn build_relay_http_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, RelayError> {
    let user_agent = user_agent::default_relay_user_agent();
    let timeouts = (connect_timeout_secs, read_timeout_secs);

    match try_build_client(&user_agent, timeouts, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings. Retry with env-proxy support only.
            warn!("Relay client hit system proxy panic; using env-proxy fallback builder");
            match try_build_client(&user_agent, timeouts, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(RelayError::ClientBuild {
                    reason: "construction panicked while initializing networking".to_string(),
                }),
                Err(BuildClientFailure::Build(error)) => Err(RelayError::ClientBuild {
                    reason: error.to_string(),
                }),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(RelayError::ClientBuild {
            reason: error.to_string(),
        }),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    user_agent: &str,
    timeouts: (u64, u64),
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let user_agent = user_agent.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(user_agent, timeouts);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(user_agent: String, (connect_secs, read_secs): (u64, u64)) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_secs))
        .timeout(Duration::from_secs(read_secs))
        .user_agent(user_agent)
        .redirect(Policy::none())
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
