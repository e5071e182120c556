//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `resolve_db_path` - Database location from the flag or the data directory
//! - `open_db` - Shared utility to open the database
//! - `cache_config` - Cache sizing from the CLI options
//! - `cmd_init` - Initialize the database

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use finbot_core::{CacheConfig, Database};

/// Use the given path, or `<data_dir>/finbot/finbot.db`
pub fn resolve_db_path(db: Option<&Path>) -> PathBuf {
    match db {
        Some(path) => path.to_path_buf(),
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("finbot")
            .join("finbot.db"),
    }
}

/// Open the database, creating its directory if needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cache_config(capacity: u64, ttl_secs: u64) -> CacheConfig {
    CacheConfig {
        capacity,
        ttl: Duration::from_secs(ttl_secs),
    }
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path)?;
    let categories = db
        .list_categories(0, None)
        .context("Failed to list categories")?;
    println!("   {} default categories available", categories.len());

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Put BOT_TOKEN=<token from @BotFather> into .env");
    println!("  2. Start the bot: finbot run");

    Ok(())
}
