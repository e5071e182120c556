//! Bot command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use finbot_core::{CacheConfig, Ledger, StatsCache};
use teloxide::Bot;
use tracing::info;

use super::open_db;
use crate::bot::{telegram, BotContext};

pub async fn cmd_run(
    db_path: &Path,
    token: &str,
    cache: CacheConfig,
    window_days: u32,
) -> Result<()> {
    println!("🚀 Starting finbot...");
    println!("   Database: {}", db_path.display());
    if cache.capacity == 0 {
        println!("   Cache: disabled");
    } else {
        println!(
            "   Cache: {} entries, {}s TTL",
            cache.capacity,
            cache.ttl.as_secs()
        );
    }
    println!("   Statistics window: {} days", window_days);

    let db = open_db(db_path)?;
    let ledger = Ledger::new(db, Arc::new(StatsCache::new(cache)));
    let ctx = BotContext::new(ledger, window_days);

    info!("Starting long polling");
    telegram::run(Bot::new(token), ctx).await
}
