//! Error types for finbot

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether the error was caused by user input rather than the store.
    ///
    /// User errors are reported back with a corrective message; everything
    /// else is treated as the store being unavailable.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidCategory(_) | Self::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
