//! Local command handlers: provider pairs, credential removal, config display.

use anyhow::{Context, Result};
use auth_relay::session::persisted_credentials_path;
use auth_relay::{CredentialStore, EncryptedFileStore, ProviderPairs};
use tracing::info;

use crate::app_config::{LoadedConfig, Settings};

pub fn run_pairs_command() -> Result<()> {
    for pair in ProviderPairs::default().pairs() {
        println!("{} <-> {}", pair.web, pair.native);
    }
    Ok(())
}

pub fn run_clear_command() -> Result<()> {
    let store = EncryptedFileStore::open_default().context("Failed to locate credential storage")?;
    let removed = store
        .clear()
        .context("Failed to clear stored credentials")?;

    if removed {
        info!(path = %store.path().display(), "Cleared stored credentials");
    } else {
        info!("No stored credentials found");
    }
    Ok(())
}

pub fn run_config_show_command(loaded: &LoadedConfig, settings: &Settings) -> Result<()> {
    let relay_config = settings.relay_config()?;
    let config_path = loaded.path.as_ref().map_or_else(
        || "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );
    let credentials_path = persisted_credentials_path().map_or_else(
        |_| "<unresolved>".to_string(),
        |path| path.display().to_string(),
    );

    println!("config_path = {config_path}");
    println!(
        "config_file = {}",
        if loaded.loaded_from_file() {
            "loaded"
        } else {
            "not found (using defaults)"
        }
    );
    println!(
        "base_url = {} ({})",
        relay_config.base_url,
        settings.base_url_source.as_str()
    );
    println!("base_path = {}", relay_config.base_path);
    println!("secure_cookies = {}", relay_config.secure_cookies());
    println!(
        "signout_callback_url = {}",
        relay_config.signout_callback_url()
    );
    println!(
        "forward_callback_url_cookie = {}",
        relay_config.callback_cookies.forward_callback_url
    );
    println!(
        "redirect_uri = {}",
        settings.redirect_uri.as_deref().unwrap_or("<unset>")
    );
    println!("connect_timeout_secs = {}", relay_config.connect_timeout_secs);
    println!("read_timeout_secs = {}", relay_config.read_timeout_secs);
    let native: Vec<&str> = settings
        .native_clients()
        .into_iter()
        .map(|(provider, _)| provider)
        .collect();
    println!(
        "native_clients = {}",
        if native.is_empty() {
            "<none>".to_string()
        } else {
            native.join(", ")
        }
    );
    println!("credentials_path = {credentials_path}");
    Ok(())
}
