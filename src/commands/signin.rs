//! Sign-in and sign-out command handlers.

use anyhow::{Context, Result, bail};
use auth_relay::{AuthClient, AuthError, AuthResult, ConsolePrompt, CredentialStore, SignInOutcome};
use tracing::{info, warn};

pub async fn run_signin_command<S: CredentialStore>(
    client: &AuthClient<S>,
    provider: &str,
) -> Result<()> {
    let outcome = client
        .sign_in(provider, &ConsolePrompt)
        .await
        .with_context(|| format!("Sign-in with '{provider}' failed"))?;

    match outcome {
        SignInOutcome::Completed(AuthResult::SessionToken(_)) => {
            info!(provider, "Signed in; session stored");
            Ok(())
        }
        SignInOutcome::Completed(AuthResult::Linked) => {
            info!(provider, "Account linked; no new session was issued");
            Ok(())
        }
        SignInOutcome::Completed(AuthResult::Error(error)) => {
            bail!("Web app rejected the sign-in: {error}")
        }
        SignInOutcome::ProviderError { error, description } => match description {
            Some(description) => bail!("Provider returned {error}: {description}"),
            None => bail!("Provider returned {error}"),
        },
        SignInOutcome::Dismissed => {
            warn!(provider, "Sign-in cancelled");
            Ok(())
        }
    }
}

pub async fn run_signout_command<S: CredentialStore>(client: &AuthClient<S>) -> Result<()> {
    match client.sign_out().await {
        Ok(()) => {
            info!("Signed out");
            Ok(())
        }
        Err(AuthError::NoSession) => {
            info!("Not signed in");
            Ok(())
        }
        Err(error) => Err(error).context("Sign-out failed"),
    }
}
