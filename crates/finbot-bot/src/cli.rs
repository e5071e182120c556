//! CLI argument definitions using clap
//!
//! Every option can also be set through the environment (or a `.env` file).
//! The command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// finbot - personal finance tracking in Telegram
#[derive(Parser)]
#[command(name = "finbot")]
#[command(about = "Telegram bot for tracking income and expenses", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the platform data directory)
    #[arg(long, env = "FINBOT_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Maximum number of cached statistics per kind (0 disables the cache)
    #[arg(long, env = "FINBOT_CACHE_CAPACITY", default_value_t = 1000, global = true)]
    pub cache_capacity: u64,

    /// Seconds a cached statistic stays valid
    #[arg(long, env = "FINBOT_CACHE_TTL_SECS", default_value_t = 300, global = true)]
    pub cache_ttl_secs: u64,

    /// Length of the statistics window in days
    #[arg(long, env = "FINBOT_WINDOW_DAYS", default_value_t = 30, global = true)]
    pub window_days: u32,

    /// Telegram bot token from @BotFather (required by `run`)
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the Telegram bot (default)
    Run,

    /// Create the database and seed the default categories
    Init,

    /// Print statistics for a user
    Stats {
        /// Telegram user id
        #[arg(short, long)]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
