//! CLI entry point for auth-relay.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

mod app_config;
mod cli;
mod commands;
mod terminal;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so --help works without logs
    let cli = Cli::parse();

    let no_color = terminal::should_disable_color(
        cli.no_color,
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(terminal::default_level(cli.verbose, cli.quiet), no_color);
    debug!(?cli, "CLI arguments parsed");

    commands::dispatch(&cli).await
}
