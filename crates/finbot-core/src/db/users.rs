//! User operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::User;

impl Database {
    /// Register a user if not known yet, refreshing the profile fields otherwise.
    ///
    /// Returns true when the user was newly created.
    pub fn ensure_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, username, first_name) VALUES (?, ?, ?)",
            params![user_id, username, first_name],
        )?;

        if inserted > 0 {
            info!(user_id, "Registered new user");
            return Ok(true);
        }

        conn.execute(
            "UPDATE users SET username = COALESCE(?, username), first_name = COALESCE(?, first_name) WHERE id = ?",
            params![username, first_name, user_id],
        )?;
        Ok(false)
    }

    /// Get a user by Telegram id
    pub fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, first_name, created_at FROM users WHERE id = ?",
                params![user_id],
                |row| {
                    let created_at: String = row.get(3)?;
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        first_name: row.get(2)?,
                        created_at: parse_datetime(&created_at),
                    })
                },
            )
            .optional()?;

        Ok(user)
    }
}
