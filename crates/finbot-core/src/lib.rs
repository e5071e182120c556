//! finbot Core Library
//!
//! Shared functionality for the finbot personal finance bot:
//! - Database access and migrations (users, categories, transactions)
//! - In-memory statistics cache with TTL and LRU eviction
//! - Statistics aggregation over a time window
//! - Ledger facade that sequences writes and cache invalidation

pub mod cache;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod stats;

pub use cache::{CacheConfig, Invalidation, StatsCache, TtlCache};
pub use db::Database;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use models::{
    Category, CategoryRemoval, CategoryTotal, FlowDirection, NewCategory, NewTransaction,
    StatsSnapshot, StatsWindow, Transaction, User, MAX_AMOUNT,
};
pub use stats::{AggregationKind, StatsAggregator, StatsKey};
