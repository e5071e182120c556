//! Stats command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use finbot_core::{CacheConfig, FlowDirection, Ledger, StatsCache, StatsWindow};

use super::open_db;
use crate::bot::views::{bar, format_amount, format_signed, share};

pub fn cmd_stats(db_path: &Path, user_id: i64, window_days: u32, json: bool) -> Result<()> {
    let db = open_db(db_path)?;
    let ledger = Ledger::new(db, Arc::new(StatsCache::new(CacheConfig::default())));
    let window = StatsWindow::last_days(window_days);

    let snapshot = ledger
        .compute_stats(user_id, &window)
        .context("Failed to compute statistics")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!();
    println!(
        "📊 Statistics for user {} ({} to {})",
        user_id,
        window.start.format("%Y-%m-%d"),
        window.end.format("%Y-%m-%d")
    );
    println!("   ─────────────────────────────");

    if snapshot.is_empty() {
        println!("   No transactions in the last {} days.", window_days);
        return Ok(());
    }

    println!("   Income:       {:>12}", format_amount(snapshot.total_income));
    println!("   Expense:      {:>12}", format_amount(snapshot.total_expense));
    println!("   Net:          {:>12}", format_signed(snapshot.net()));
    println!("   Transactions: {:>12}", snapshot.transaction_count);

    for (direction, whole) in [
        (FlowDirection::Income, snapshot.total_income),
        (FlowDirection::Expense, snapshot.total_expense),
    ] {
        let ranked = snapshot.ranked(direction);
        if ranked.is_empty() {
            continue;
        }
        println!();
        println!("   {} by category:", direction);
        for total in ranked {
            let percent = share(total.total, whole);
            println!(
                "   {} {:<16} {:>12} {:>7} {}",
                total.icon,
                total.name,
                format_amount(total.total.abs()),
                format!("{}%", percent),
                bar(percent)
            );
        }
    }

    let balance = ledger.balance(user_id).context("Failed to compute balance")?;
    println!();
    println!("   All-time balance: {}", format_signed(balance));

    Ok(())
}
