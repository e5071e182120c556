//! finbot - personal finance tracking in Telegram
//!
//! Usage:
//!   finbot run                 Run the bot (default; needs BOT_TOKEN)
//!   finbot init                Initialize database
//!   finbot stats --user ID     Print a user's statistics

mod bot;
mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Values in .env fill in for unset environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let db_path = commands::resolve_db_path(cli.db.as_deref());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let token = cli
                .token
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .context("BOT_TOKEN is not set (use --token, the environment or .env)")?;
            let cache = commands::cache_config(cli.cache_capacity, cli.cache_ttl_secs);
            commands::cmd_run(&db_path, token, cache, cli.window_days).await
        }
        Commands::Init => commands::cmd_init(&db_path),
        Commands::Stats { user, json } => {
            commands::cmd_stats(&db_path, user, cli.window_days, json)
        }
    }
}
