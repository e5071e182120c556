//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (database path, open_db, cache config) and init
//! - `run` - Run the Telegram bot
//! - `stats` - Print a user's statistics

pub mod core;
pub mod run;
pub mod stats;

// Re-export command functions for main.rs
pub use self::core::*;
pub use self::run::*;
pub use self::stats::*;
