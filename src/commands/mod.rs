//! CLI command handlers.

mod local;
mod relay;
mod signin;

use anyhow::{Context, Result, bail};
use auth_relay::{AuthClient, EncryptedFileStore, RelayClient};

use crate::app_config::{Settings, load_default_file_config};
use crate::cli::{Cli, Command};

pub use local::{run_clear_command, run_config_show_command, run_pairs_command};
pub use relay::{run_csrf_command, run_providers_command, run_proxy_command, run_session_command};
pub use signin::{run_signin_command, run_signout_command};

/// Runs the subcommand selected on the command line.
pub(crate) async fn dispatch(cli: &Cli) -> Result<()> {
    let loaded = load_default_file_config()?;
    let settings = Settings::resolve(
        loaded.config.as_ref(),
        Settings::env_base_url(),
        cli.base_url.as_deref(),
    );

    match &cli.command {
        Command::Pairs => run_pairs_command(),
        Command::Clear => run_clear_command(),
        Command::Config => run_config_show_command(&loaded, &settings),
        Command::Csrf => run_csrf_command(&build_auth_client(&settings)?).await,
        Command::Session => run_session_command(&build_auth_client(&settings)?).await,
        Command::Providers => run_providers_command(&build_auth_client(&settings)?).await,
        Command::Proxy { path } => run_proxy_command(&build_auth_client(&settings)?, path).await,
        Command::Signin { provider } => {
            if settings.redirect_uri.is_none() {
                bail!("`redirect_uri` is not configured; set it in the config file");
            }
            run_signin_command(&build_auth_client(&settings)?, provider).await
        }
        Command::Signout => run_signout_command(&build_auth_client(&settings)?).await,
    }
}

fn build_auth_client(settings: &Settings) -> Result<AuthClient<EncryptedFileStore>> {
    let relay = RelayClient::new(settings.relay_config()?).context("Failed to build HTTP client")?;
    let store = EncryptedFileStore::open_default().context("Failed to locate credential storage")?;
    let redirect_uri = settings.redirect_uri.clone().unwrap_or_default();

    let client = settings
        .native_clients()
        .into_iter()
        .fold(AuthClient::new(relay, store, redirect_uri), |client, (provider, native)| {
            client.with_native_client(provider, native)
        });
    Ok(client)
}
