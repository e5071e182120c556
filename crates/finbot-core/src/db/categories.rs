//! Category operations
//!
//! Global defaults have `user_id IS NULL` and are visible to everyone.
//! User-defined categories are visible only to their owner. Categories that are
//! still referenced by transactions are hidden instead of deleted.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{direction_column, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryRemoval, FlowDirection, NewCategory, DEFAULT_CATEGORY_ICON};

/// Default categories: (key, name, direction, icon)
pub const DEFAULT_CATEGORIES: &[(&str, &str, FlowDirection, &str)] = &[
    ("salary", "Salary", FlowDirection::Income, "💼"),
    ("freelance", "Freelance", FlowDirection::Income, "💻"),
    ("investments", "Investments", FlowDirection::Income, "📈"),
    ("gifts", "Gifts", FlowDirection::Income, "🎁"),
    ("other_income", "Other", FlowDirection::Income, "❓"),
    ("food", "Food", FlowDirection::Expense, "🍽️"),
    ("transport", "Transport", FlowDirection::Expense, "🚇"),
    ("housing", "Housing", FlowDirection::Expense, "🏠"),
    ("entertainment", "Entertainment", FlowDirection::Expense, "🎉"),
    ("health", "Health", FlowDirection::Expense, "💊"),
    ("clothes", "Clothes", FlowDirection::Expense, "👚"),
    ("electronics", "Electronics", FlowDirection::Expense, "🔌"),
    ("other_expense", "Other", FlowDirection::Expense, "❓"),
];

/// Longest accepted category name
const MAX_CATEGORY_NAME_LEN: usize = 64;

const CATEGORY_COLUMNS: &str = "id, user_id, key, name, direction, icon, hidden, created_at";

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    let created_at: String = row.get(7)?;
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        key: row.get(2)?,
        name: row.get(3)?,
        direction: direction_column(row, 4)?,
        icon: row.get(5)?,
        hidden: row.get(6)?,
        created_at: parse_datetime(&created_at),
    })
}

/// Derive a category key from its display name ("Pet Food" -> "pet_food")
pub(crate) fn slugify(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    for c in name.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            key.push(c);
        } else if !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_matches('_').to_string()
}

impl Database {
    /// Insert the default categories that are not present yet.
    ///
    /// Returns the number of categories inserted.
    pub fn seed_default_categories(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut inserted = 0;

        for (key, name, direction, icon) in DEFAULT_CATEGORIES {
            // UNIQUE does not apply across NULL user_id, so check explicitly
            inserted += conn.execute(
                r#"
                INSERT INTO categories (user_id, key, name, direction, icon)
                SELECT NULL, ?1, ?2, ?3, ?4
                WHERE NOT EXISTS (
                    SELECT 1 FROM categories WHERE user_id IS NULL AND key = ?1 AND direction = ?3
                )
                "#,
                params![key, name, direction.as_str(), icon],
            )?;
        }

        if inserted > 0 {
            info!("Seeded {} default categories", inserted);
        }
        Ok(inserted)
    }

    /// List categories visible to a user (global + own, not hidden)
    pub fn list_categories(
        &self,
        user_id: i64,
        direction: Option<FlowDirection>,
    ) -> Result<Vec<Category>> {
        let conn = self.conn()?;

        let mut sql = format!(
            "SELECT {} FROM categories WHERE (user_id IS NULL OR user_id = ?) AND hidden = 0",
            CATEGORY_COLUMNS
        );
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

        if let Some(d) = direction {
            sql.push_str(" AND direction = ?");
            params.push(Box::new(d.as_str()));
        }

        // Defaults first in seed order, then the user's own in creation order
        sql.push_str(" ORDER BY user_id IS NOT NULL, id");

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map(param_refs.as_slice(), category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Get a category in the user's scope (hidden ones included)
    pub fn get_category(&self, user_id: i64, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        Ok(get_category_in_scope(&conn, user_id, id)?)
    }

    /// Find a category in the user's scope by key and direction
    pub fn find_category(
        &self,
        user_id: i64,
        key: &str,
        direction: FlowDirection,
    ) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                &format!(
                    "SELECT {} FROM categories WHERE (user_id IS NULL OR user_id = ?) AND key = ? AND direction = ? ORDER BY user_id IS NULL LIMIT 1",
                    CATEGORY_COLUMNS
                ),
                params![user_id, key, direction.as_str()],
                category_from_row,
            )
            .optional()?;

        Ok(category)
    }

    /// Create a user-defined category.
    ///
    /// A hidden category of the user's with the same name is shown again
    /// instead of creating a duplicate.
    pub fn create_category(&self, new: &NewCategory) -> Result<Category> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Category name cannot be empty".to_string()));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_LEN {
            return Err(Error::Validation(format!(
                "Category name is longer than {} characters",
                MAX_CATEGORY_NAME_LEN
            )));
        }
        let key = slugify(name);
        if key.is_empty() {
            return Err(Error::Validation(format!(
                "Category name '{}' has no letters or digits",
                name
            )));
        }

        if let Some(existing) = self.find_category(new.user_id, &key, new.direction)? {
            if existing.user_id == Some(new.user_id) && existing.hidden {
                let conn = self.conn()?;
                conn.execute(
                    "UPDATE categories SET hidden = 0 WHERE id = ?",
                    params![existing.id],
                )?;
                debug!(category_id = existing.id, "Unhid category");
                return Ok(Category {
                    hidden: false,
                    ..existing
                });
            }
            return Err(Error::Validation(format!(
                "{} category '{}' already exists",
                new.direction, existing.name
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (id) VALUES (?)",
            params![new.user_id],
        )?;
        conn.execute(
            "INSERT INTO categories (user_id, key, name, direction, icon) VALUES (?, ?, ?, ?, ?)",
            params![
                new.user_id,
                key,
                name,
                new.direction.as_str(),
                new.icon.as_deref().unwrap_or(DEFAULT_CATEGORY_ICON),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(user_id = new.user_id, category_id = id, "Created category '{}'", name);

        get_category_in_scope(&conn, new.user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {}", id)))
    }

    /// Remove a user-defined category.
    ///
    /// Categories referenced by transactions are hidden, the rest are deleted.
    /// Global defaults cannot be removed.
    pub fn remove_category(&self, user_id: i64, id: i64) -> Result<CategoryRemoval> {
        let conn = self.conn()?;

        let category = get_category_in_scope(&conn, user_id, id)?
            .ok_or_else(|| Error::NotFound(format!("Category {}", id)))?;

        if category.is_global() {
            return Err(Error::Validation(format!(
                "Built-in category '{}' cannot be removed",
                category.name
            )));
        }

        let references: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id = ?",
            params![id],
            |row| row.get(0),
        )?;

        if references > 0 {
            conn.execute("UPDATE categories SET hidden = 1 WHERE id = ?", params![id])?;
            info!(user_id, category_id = id, references, "Hid referenced category");
            Ok(CategoryRemoval::Hidden)
        } else {
            conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
            info!(user_id, category_id = id, "Deleted category");
            Ok(CategoryRemoval::Deleted)
        }
    }
}

/// Category lookup restricted to global + the user's own rows
pub(crate) fn get_category_in_scope(
    conn: &Connection,
    user_id: i64,
    id: i64,
) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM categories WHERE id = ? AND (user_id IS NULL OR user_id = ?)",
            CATEGORY_COLUMNS
        ),
        params![id, user_id],
        category_from_row,
    )
    .optional()
}
