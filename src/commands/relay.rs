//! Relay command handlers: CSRF, session, providers, and raw proxy reads.

use anyhow::{Context, Result};
use auth_relay::{AuthClient, CredentialStore};
use serde_json::Value;
use tracing::info;

pub async fn run_csrf_command<S: CredentialStore>(client: &AuthClient<S>) -> Result<()> {
    let csrf = client
        .get_csrf_token()
        .await
        .context("Failed to fetch CSRF token")?;
    info!("Stored CSRF cookie");
    println!("{}", csrf.csrf_token);
    Ok(())
}

pub async fn run_session_command<S: CredentialStore>(client: &AuthClient<S>) -> Result<()> {
    let session = client
        .get_session()
        .await
        .context("Failed to fetch session")?;
    if session.is_none() {
        info!("Not signed in");
    }
    print_payload(session.as_ref())
}

pub async fn run_providers_command<S: CredentialStore>(client: &AuthClient<S>) -> Result<()> {
    let providers = client
        .get_providers()
        .await
        .context("Failed to fetch providers")?;
    print_payload(providers.as_ref())
}

pub async fn run_proxy_command<S: CredentialStore>(client: &AuthClient<S>, path: &str) -> Result<()> {
    let payload = client
        .fetch_data(path)
        .await
        .with_context(|| format!("Failed to fetch '{path}'"))?;
    print_payload(payload.as_ref())
}

fn print_payload(payload: Option<&Value>) -> Result<()> {
    println!("{}", render_payload(payload)?);
    Ok(())
}

fn render_payload(payload: Option<&Value>) -> Result<String> {
    match payload {
        Some(value) => serde_json::to_string_pretty(value).context("Failed to render response"),
        None => Ok("null".to_string()),
    }
}
