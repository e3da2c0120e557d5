//! File configuration and effective settings for the CLI.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use auth_relay::relay::{
    CallbackCookiePolicy, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS,
};
use auth_relay::{NativeClient, RelayConfig};

/// Web app origin used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "NEXTAUTH_URL";

/// `key = value` file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Web app origin.
    pub base_url: Option<String>,
    /// Auth surface path under the origin.
    pub base_path: Option<String>,
    /// Force secure (or insecure) cookie names.
    pub use_secure_cookies: Option<bool>,
    /// `callbackUrl` sent on sign-out.
    pub signout_callback_url: Option<String>,
    /// Replay the callback-url cookie on the callback request.
    pub forward_callback_url_cookie: Option<bool>,
    /// Broker redirect URI registered with the providers.
    pub redirect_uri: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    /// Native OAuth app client id for GitHub.
    pub github_client_id: Option<String>,
    /// Native OAuth app client id for Discord.
    pub discord_client_id: Option<String>,
}

impl FileConfig {
    /// Validates values that the relay would otherwise reject later.
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            validate_http_url("base_url", base_url)?;
        }
        if let Some(redirect_uri) = &self.redirect_uri {
            validate_http_url("redirect_uri", redirect_uri)?;
        }
        if let Some(base_path) = &self.base_path
            && !base_path.starts_with('/')
        {
            bail!("Invalid config value for `base_path`: '{base_path}'. Expected a path starting with '/'");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .with_context(|| format!("Invalid config value for `{field}`: '{value}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Invalid config value for `{field}`: '{value}'. Expected an http(s) URL");
    }
    Ok(())
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    /// Whether configuration was read from disk.
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/auth-relay/config.toml`
/// 2. `$HOME/.config/auth-relay/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("auth-relay")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("auth-relay")
            .join("config.toml"),
    )
}

fn env_var_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Loads config from the default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_number = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_number}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_number}");

        match key {
            "base_url" => cfg.base_url = Some(parse_string_literal(value).with_context(context)?),
            "base_path" => cfg.base_path = Some(parse_string_literal(value).with_context(context)?),
            "use_secure_cookies" => {
                cfg.use_secure_cookies = Some(parse_boolean(value).with_context(context)?);
            }
            "signout_callback_url" => {
                cfg.signout_callback_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "forward_callback_url_cookie" => {
                cfg.forward_callback_url_cookie = Some(parse_boolean(value).with_context(context)?);
            }
            "redirect_uri" => {
                cfg.redirect_uri = Some(parse_string_literal(value).with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "github_client_id" => {
                cfg.github_client_id = Some(parse_string_literal(value).with_context(context)?);
            }
            "discord_client_id" => {
                cfg.discord_client_id = Some(parse_string_literal(value).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_number}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Where the effective base URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrlSource {
    Cli,
    Env,
    File,
    Default,
}

impl BaseUrlSource {
    /// Stable label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::File => "file",
            Self::Default => "default",
        }
    }
}

/// Effective settings after applying file, environment, and CLI layers.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub base_url_source: BaseUrlSource,
    /// Explicit auth path; otherwise taken from the base URL's path.
    pub base_path: Option<String>,
    pub use_secure_cookies: Option<bool>,
    pub signout_callback_url: Option<String>,
    pub forward_callback_url_cookie: bool,
    pub redirect_uri: Option<String>,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub github_client_id: Option<String>,
    pub discord_client_id: Option<String>,
}

impl Settings {
    /// Layers `cli_base_url` over `env_base_url` over the file config.
    #[must_use]
    pub fn resolve(
        file: Option<&FileConfig>,
        env_base_url: Option<String>,
        cli_base_url: Option<&str>,
    ) -> Self {
        let file = file.cloned().unwrap_or_default();
        let (base_url, base_url_source) = if let Some(url) = cli_base_url {
            (url.to_string(), BaseUrlSource::Cli)
        } else if let Some(url) = env_base_url {
            (url, BaseUrlSource::Env)
        } else if let Some(url) = file.base_url {
            (url, BaseUrlSource::File)
        } else {
            (DEFAULT_BASE_URL.to_string(), BaseUrlSource::Default)
        };

        Self {
            base_url,
            base_url_source,
            base_path: file.base_path,
            use_secure_cookies: file.use_secure_cookies,
            signout_callback_url: file.signout_callback_url,
            forward_callback_url_cookie: file.forward_callback_url_cookie.unwrap_or(false),
            redirect_uri: file.redirect_uri,
            connect_timeout_secs: file
                .connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout_secs: file.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
            github_client_id: file.github_client_id,
            discord_client_id: file.discord_client_id,
        }
    }

    /// Reads `NEXTAUTH_URL` for [`Settings::resolve`].
    #[must_use]
    pub fn env_base_url() -> Option<String> {
        env_var_non_empty(BASE_URL_ENV)
    }

    /// Relay configuration for these settings.
    pub fn relay_config(&self) -> Result<RelayConfig> {
        let mut config = RelayConfig::new(&self.base_url)
            .with_context(|| format!("Invalid base URL ({})", self.base_url_source.as_str()))?;
        if let Some(base_path) = &self.base_path {
            config.base_path.clone_from(base_path);
        }
        config.use_secure_cookies = self.use_secure_cookies;
        config.signout_callback_url.clone_from(&self.signout_callback_url);
        config.callback_cookies = CallbackCookiePolicy {
            forward_callback_url: self.forward_callback_url_cookie,
        };
        config.connect_timeout_secs = self.connect_timeout_secs;
        config.read_timeout_secs = self.read_timeout_secs;
        Ok(config)
    }

    /// Native clients keyed by web provider id.
    #[must_use]
    pub fn native_clients(&self) -> Vec<(&'static str, NativeClient)> {
        let mut clients = Vec::new();
        if let Some(id) = &self.github_client_id {
            clients.push(("github", NativeClient::github(id.clone())));
        }
        if let Some(id) = &self.discord_client_id {
            clients.push(("discord", NativeClient::discord(id.clone())));
        }
        clients
    }
}
