//! Platform prompt seam and redirect interpretation.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};
use url::Url;

use super::{AuthorizationRequest, BridgeError};

/// What the platform primitive reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The provider redirected with an authorization code.
    Success { code: String },
    /// The provider redirected with an error.
    Error {
        error: String,
        description: Option<String>,
    },
    /// The user closed the prompt.
    Dismissed,
}

/// Opens the provider consent screen and waits for the broker redirect.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// Runs the authorization request to completion.
    async fn prompt(&self, request: &AuthorizationRequest) -> Result<PromptOutcome, BridgeError>;
}

/// Interprets the redirect URL the platform received.
///
/// When a state was sent, the redirect must echo it back.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidRedirect`] for non-URLs,
/// [`BridgeError::StateMismatch`] when the echoed state differs, and
/// [`BridgeError::MissingCode`] when the redirect has neither `code` nor `error`.
pub fn parse_redirect(
    redirect: &str,
    expected_state: Option<&str>,
) -> Result<PromptOutcome, BridgeError> {
    let url = Url::parse(redirect.trim()).map_err(|_| BridgeError::InvalidRedirect {
        url: redirect.to_string(),
    })?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        return Ok(PromptOutcome::Error {
            error,
            description: param("error_description"),
        });
    }

    if let Some(expected) = expected_state
        && param("state").as_deref() != Some(expected)
    {
        warn!("authorization redirect state does not match request");
        return Err(BridgeError::StateMismatch);
    }

    match param("code") {
        Some(code) if !code.is_empty() => Ok(PromptOutcome::Success { code }),
        _ => Err(BridgeError::MissingCode),
    }
}

/// Console-driven prompt: writes the authorization URL to stderr and reads the
/// redirected URL pasted by the user. An empty line dismisses the prompt.
///
/// The URL bypasses tracing so log filters (`-q`, `RUST_LOG`) cannot hide it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl ConsolePrompt {
    /// Runs the prompt against an arbitrary line reader and instruction writer.
    ///
    /// # Errors
    ///
    /// See [`parse_redirect`]; I/O failures map to [`BridgeError::Io`].
    pub async fn prompt_with_io<R, W>(
        &self,
        request: &AuthorizationRequest,
        reader: &mut R,
        writer: &mut W,
    ) -> Result<PromptOutcome, BridgeError>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let url = request.authorization_url()?;
        let instructions = format!(
            "Open this URL in a browser and approve access:\n{url}\n\
             Then paste the full redirected URL (empty line to cancel):\n"
        );
        writer.write_all(instructions.as_bytes()).await?;
        writer.flush().await?;
        debug!("authorization URL shown");

        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        let input = line.trim();
        if read == 0 || input.is_empty() {
            debug!("authorization prompt dismissed");
            return Ok(PromptOutcome::Dismissed);
        }

        parse_redirect(input, request.state.as_deref())
    }
}

#[async_trait]
impl AuthorizationPrompt for ConsolePrompt {
    async fn prompt(&self, request: &AuthorizationRequest) -> Result<PromptOutcome, BridgeError> {
        let mut stdin = BufReader::new(tokio::io::stdin());
        let mut stderr = tokio::io::stderr();
        self.prompt_with_io(request, &mut stdin, &mut stderr).await
    }
}
