//! CLI argument definitions using clap derive macros.

use clap::{Parser, Subcommand};

/// Drive a web app's OAuth sign-in from the terminal.
///
/// auth-relay talks to the web app's auth endpoints, hands the provider
/// consent step to a console prompt, and keeps the resulting session token
/// encrypted on disk.
#[derive(Parser, Debug)]
#[command(name = "auth-relay")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Web app origin (overrides NEXTAUTH_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch a CSRF token and store its cookie
    Csrf,
    /// Print the current session
    Session,
    /// Print the providers configured on the web app
    Providers,
    /// GET an arbitrary path on the auth surface with stored credentials
    Proxy {
        /// Path below the auth base path, e.g. `session`
        path: String,
    },
    /// Sign in with a web provider through its native counterpart
    Signin {
        /// Web provider id, e.g. `github`
        provider: String,
    },
    /// Sign out and clear stored credentials
    Signout,
    /// List web/native provider pairs
    Pairs,
    /// Remove stored credentials without contacting the web app
    Clear,
    /// Show the effective configuration
    Config,
}
