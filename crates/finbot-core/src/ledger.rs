//! Ledger: the operations the bot calls into
//!
//! Wraps the store and the statistics aggregator. Every write is committed to
//! the database first and only then are the user's cached statistics dropped.
//! Reads that started before the write see the invalidation through the
//! user's cache generation and do not store their result.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::cache::StatsCache;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    Category, CategoryRemoval, CategoryTotal, FlowDirection, NewCategory, NewTransaction,
    StatsSnapshot, StatsWindow, Transaction,
};
use crate::stats::StatsAggregator;

#[derive(Clone)]
pub struct Ledger {
    db: Database,
    stats: StatsAggregator,
}

impl Ledger {
    pub fn new(db: Database, cache: Arc<StatsCache>) -> Self {
        let stats = StatsAggregator::new(db.clone(), cache);
        Self { db, stats }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn invalidate(&self, user_id: i64) {
        self.stats.cache().invalidate_user(user_id);
    }

    /// Register (or refresh) a user. Returns true for a new user.
    pub fn register_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<bool> {
        self.db.ensure_user(user_id, username, first_name)
    }

    pub fn add_transaction(
        &self,
        user_id: i64,
        category_id: i64,
        amount: Decimal,
        direction: FlowDirection,
        note: Option<&str>,
    ) -> Result<Transaction> {
        let mut new = NewTransaction::new(user_id, category_id, direction, amount);
        if let Some(note) = note {
            new = new.with_note(note);
        }
        self.record(&new)
    }

    /// Insert a fully specified transaction (e.g. with a past timestamp)
    pub fn record(&self, new: &NewTransaction) -> Result<Transaction> {
        let transaction = self.db.insert_transaction(new)?;
        self.invalidate(new.user_id);
        Ok(transaction)
    }

    /// Delete one of the user's transactions
    pub fn delete_transaction(&self, user_id: i64, transaction_id: i64) -> Result<Transaction> {
        let transaction = self
            .db
            .get_transaction(user_id, transaction_id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", transaction_id)))?;

        if !self.db.delete_transaction(user_id, transaction_id)? {
            return Err(Error::NotFound(format!("Transaction {}", transaction_id)));
        }
        self.invalidate(user_id);
        Ok(transaction)
    }

    pub fn recent_transactions(&self, user_id: i64, limit: usize) -> Result<Vec<Transaction>> {
        self.db.list_transactions(user_id, None, Some(limit))
    }

    pub fn list_categories(
        &self,
        user_id: i64,
        direction: Option<FlowDirection>,
    ) -> Result<Vec<Category>> {
        self.db.list_categories(user_id, direction)
    }

    pub fn category(&self, user_id: i64, category_id: i64) -> Result<Category> {
        self.db
            .get_category(user_id, category_id)?
            .ok_or_else(|| Error::NotFound(format!("Category {}", category_id)))
    }

    pub fn add_category(
        &self,
        user_id: i64,
        name: &str,
        direction: FlowDirection,
    ) -> Result<Category> {
        self.db.create_category(&NewCategory {
            user_id,
            name: name.to_string(),
            direction,
            icon: None,
        })
    }

    /// Remove (or hide) a category. Hiding changes no totals, but a deleted
    /// category may still be named in cached breakdowns, so drop them either way.
    pub fn remove_category(&self, user_id: i64, category_id: i64) -> Result<CategoryRemoval> {
        let removal = self.db.remove_category(user_id, category_id)?;
        self.invalidate(user_id);
        Ok(removal)
    }

    pub fn compute_stats(&self, user_id: i64, window: &StatsWindow) -> Result<StatsSnapshot> {
        self.stats.compute_stats(user_id, window)
    }

    pub fn category_breakdown(
        &self,
        user_id: i64,
        window: &StatsWindow,
        direction: FlowDirection,
    ) -> Result<Vec<CategoryTotal>> {
        self.stats.category_breakdown(user_id, window, direction)
    }

    /// All-time income minus expense
    pub fn balance(&self, user_id: i64) -> Result<Decimal> {
        self.db.total_balance(user_id)
    }
}
