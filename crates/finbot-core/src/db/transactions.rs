//! Transaction operations

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::categories::get_category_in_scope;
use super::{decimal_column, direction_column, format_timestamp, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{NewTransaction, StatsWindow, Transaction, MAX_AMOUNT, MAX_NOTE_LEN};

const TRANSACTION_SELECT: &str = r#"
    SELECT t.id, t.user_id, t.category_id, c.name, c.icon, t.direction, t.amount,
           t.note, t.occurred_at, t.created_at
    FROM transactions t
    JOIN categories c ON t.category_id = c.id
"#;

fn transaction_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    let occurred_at: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        category_name: row.get(3)?,
        category_icon: row.get(4)?,
        direction: direction_column(row, 5)?,
        amount: decimal_column(row, 6)?,
        note: row.get(7)?,
        occurred_at: parse_datetime(&occurred_at),
        created_at: parse_datetime(&created_at),
    })
}

/// Trim the note, drop it when blank and cap its length
fn clean_note(note: Option<&str>) -> Option<String> {
    let note = note?.trim();
    if note.is_empty() {
        return None;
    }
    Some(note.chars().take(MAX_NOTE_LEN).collect())
}

impl Database {
    /// Record a transaction.
    ///
    /// The amount must be positive (rounded to cents) and at most
    /// [`MAX_AMOUNT`], and the category must be
    /// visible to the user, not hidden, and of the same direction. Validation
    /// and insert run in one SQLite transaction, so a rejected entry leaves no
    /// trace.
    pub fn insert_transaction(&self, new: &NewTransaction) -> Result<Transaction> {
        let amount = new.amount.round_dp(2);
        if amount <= Decimal::ZERO {
            return Err(Error::Validation(format!(
                "Amount must be positive, got {}",
                new.amount
            )));
        }
        if amount > MAX_AMOUNT {
            return Err(Error::Validation(format!(
                "Amount must not exceed {}, got {}",
                MAX_AMOUNT, new.amount
            )));
        }

        let note = clean_note(new.note.as_deref());
        let occurred_at = new.occurred_at.unwrap_or_else(Utc::now);

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO users (id) VALUES (?)",
            params![new.user_id],
        )?;

        let category = get_category_in_scope(&tx, new.user_id, new.category_id)?.ok_or_else(
            || Error::InvalidCategory(format!("Category {} does not exist", new.category_id)),
        )?;
        if category.hidden {
            return Err(Error::InvalidCategory(format!(
                "Category '{}' is hidden",
                category.name
            )));
        }
        if category.direction != new.direction {
            return Err(Error::InvalidCategory(format!(
                "Category '{}' is for {}, not {}",
                category.name, category.direction, new.direction
            )));
        }

        tx.execute(
            r#"
            INSERT INTO transactions (user_id, category_id, direction, amount, note, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                new.user_id,
                new.category_id,
                new.direction.as_str(),
                amount.to_string(),
                note,
                format_timestamp(occurred_at),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        info!(
            user_id = new.user_id,
            transaction_id = id,
            direction = %new.direction,
            %amount,
            "Recorded transaction in '{}'",
            category.name
        );

        self.get_transaction(new.user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Transaction {}", id)))
    }

    /// Get one of the user's transactions
    pub fn get_transaction(&self, user_id: i64, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let transaction = conn
            .query_row(
                &format!("{} WHERE t.id = ? AND t.user_id = ?", TRANSACTION_SELECT),
                params![id, user_id],
                transaction_from_row,
            )
            .optional()?;

        Ok(transaction)
    }

    /// List a user's transactions, newest first, optionally within a window
    pub fn list_transactions(
        &self,
        user_id: i64,
        window: Option<&StatsWindow>,
        limit: Option<usize>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;

        let mut sql = format!("{} WHERE t.user_id = ?", TRANSACTION_SELECT);
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(w) = window {
            sql.push_str(" AND t.occurred_at >= ? AND t.occurred_at < ?");
            params.push(Box::new(format_timestamp(w.start)));
            params.push(Box::new(format_timestamp(w.end)));
        }

        sql.push_str(" ORDER BY t.occurred_at DESC, t.id DESC");

        if let Some(l) = limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(i64::try_from(l).unwrap_or(i64::MAX)));
        }

        debug!(user_id, ?window, ?limit, "Listing transactions");

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(param_refs.as_slice(), transaction_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    /// All of a user's transactions inside the window
    pub fn transactions_in_window(
        &self,
        user_id: i64,
        window: &StatsWindow,
    ) -> Result<Vec<Transaction>> {
        self.list_transactions(user_id, Some(window), None)
    }

    /// Delete one of the user's transactions. Returns false if it did not exist.
    pub fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;

        if deleted > 0 {
            info!(user_id, transaction_id = id, "Deleted transaction");
        }
        Ok(deleted > 0)
    }

    /// All-time income minus expense for a user
    pub fn total_balance(&self, user_id: i64) -> Result<Decimal> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT direction, amount FROM transactions WHERE user_id = ?")?;

        let mut balance = Decimal::ZERO;
        let mut rows = stmt.query(params![user_id])?;
        while let Some(row) = rows.next()? {
            let direction = direction_column(row, 0)?;
            balance = balance
                .checked_add(direction.signed(decimal_column(row, 1)?))
                .ok_or_else(|| {
                    Error::InvalidData(format!("Balance of user {} overflows", user_id))
                })?;
        }

        Ok(balance)
    }
}
