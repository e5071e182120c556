//! Statistics aggregation over a time window
//!
//! Results are read through the [`StatsCache`]; on a miss the user's
//! transactions in the window are fetched and folded into a snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use crate::cache::{user_prefix, StatsCache};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{CategoryTotal, FlowDirection, StatsSnapshot, StatsWindow, Transaction};

/// Which aggregate a cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationKind {
    Summary,
    ByCategory(FlowDirection),
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::ByCategory(FlowDirection::Income) => "by_category_income",
            Self::ByCategory(FlowDirection::Expense) => "by_category_expense",
        }
    }
}

/// Cache key for one aggregate: `user:{id}:{kind}:{start}:{end}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsKey {
    pub user_id: i64,
    pub kind: AggregationKind,
    pub window: StatsWindow,
}

impl StatsKey {
    pub fn new(user_id: i64, kind: AggregationKind, window: StatsWindow) -> Self {
        Self {
            user_id,
            kind,
            window,
        }
    }
}

impl fmt::Display for StatsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}:{}",
            user_prefix(self.user_id),
            self.kind.as_str(),
            self.window.start.timestamp(),
            self.window.end.timestamp()
        )
    }
}

/// Fold transactions into a snapshot.
///
/// Transactions outside the window are ignored. Per-category totals are
/// signed (income positive, expense negative); the income and expense totals
/// are both non-negative. Sums that do not fit a `Decimal` are reported as
/// [`Error::InvalidData`].
pub fn summarize(window: StatsWindow, transactions: &[Transaction]) -> Result<StatsSnapshot> {
    let mut snapshot = StatsSnapshot::empty(window);
    let mut by_category: BTreeMap<i64, CategoryTotal> = BTreeMap::new();

    for tx in transactions.iter().filter(|t| window.contains(t.occurred_at)) {
        let total = match tx.direction {
            FlowDirection::Income => &mut snapshot.total_income,
            FlowDirection::Expense => &mut snapshot.total_expense,
        };
        *total = checked_sum(*total, tx.amount, tx.user_id)?;
        snapshot.transaction_count += 1;

        let entry = by_category
            .entry(tx.category_id)
            .or_insert_with(|| CategoryTotal {
                category_id: tx.category_id,
                name: tx.category_name.clone(),
                icon: tx.category_icon.clone(),
                direction: tx.direction,
                total: Decimal::ZERO,
                transaction_count: 0,
            });
        entry.total = checked_sum(entry.total, tx.signed_amount(), tx.user_id)?;
        entry.transaction_count += 1;
    }

    snapshot.by_category = by_category;
    Ok(snapshot)
}

fn checked_sum(total: Decimal, amount: Decimal, user_id: i64) -> Result<Decimal> {
    total
        .checked_add(amount)
        .ok_or_else(|| Error::InvalidData(format!("Statistics of user {} overflow", user_id)))
}

/// Computes statistics for a user, caching the results
#[derive(Clone)]
pub struct StatsAggregator {
    db: Database,
    cache: Arc<StatsCache>,
}

impl StatsAggregator {
    pub fn new(db: Database, cache: Arc<StatsCache>) -> Self {
        Self { db, cache }
    }

    pub fn cache(&self) -> &StatsCache {
        &self.cache
    }

    /// Income, expense and per-category totals for the window
    pub fn compute_stats(&self, user_id: i64, window: &StatsWindow) -> Result<StatsSnapshot> {
        let key = StatsKey::new(user_id, AggregationKind::Summary, *window).to_string();
        if let Some(snapshot) = self.cache.snapshots().get(&key) {
            return Ok(snapshot);
        }

        let generation = self.cache.generation(user_id);
        let transactions = self.db.transactions_in_window(user_id, window)?;
        let snapshot = summarize(*window, &transactions)?;
        debug!(
            user_id,
            transactions = snapshot.transaction_count,
            categories = snapshot.by_category.len(),
            "Computed stats"
        );

        self.cache.store_if_current(
            self.cache.snapshots(),
            user_id,
            generation,
            key,
            snapshot.clone(),
        );
        Ok(snapshot)
    }

    /// Per-category totals of one direction, largest first
    pub fn category_breakdown(
        &self,
        user_id: i64,
        window: &StatsWindow,
        direction: FlowDirection,
    ) -> Result<Vec<CategoryTotal>> {
        let key = StatsKey::new(user_id, AggregationKind::ByCategory(direction), *window).to_string();
        if let Some(totals) = self.cache.breakdowns().get(&key) {
            return Ok(totals);
        }

        let generation = self.cache.generation(user_id);
        let snapshot = self.compute_stats(user_id, window)?;
        let totals: Vec<CategoryTotal> = snapshot.ranked(direction).into_iter().cloned().collect();

        self.cache.store_if_current(
            self.cache.breakdowns(),
            user_id,
            generation,
            key,
            totals.clone(),
        );
        Ok(totals)
    }
}
