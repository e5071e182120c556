//! Domain models for finbot

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Notes longer than this are truncated on insert
pub const MAX_NOTE_LEN: usize = 1000;

/// Largest amount a single transaction may carry (one trillion)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Icon used when a category is created without one
pub const DEFAULT_CATEGORY_ICON: &str = "📁";

/// A bot user, keyed by Telegram user id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Direction of money flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Income,
    Expense,
}

impl FlowDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Apply the snapshot sign convention: income positive, expense negative
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

impl std::str::FromStr for FlowDirection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" | "in" => Ok(Self::Income),
            "expense" | "out" => Ok(Self::Expense),
            _ => Err(format!("Unknown flow direction: {}", s)),
        }
    }
}

impl std::fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A category transactions are classified into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// Owner of a user-defined category; `None` for the global defaults
    pub user_id: Option<i64>,
    /// Stable identifier derived from the name (e.g. `salary`)
    pub key: String,
    pub name: String,
    pub direction: FlowDirection,
    pub icon: String,
    /// Hidden categories stay referenced by old transactions but are not offered
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn is_global(&self) -> bool {
        self.user_id.is_none()
    }

    /// Button/display label, e.g. "💼 Salary"
    pub fn label(&self) -> String {
        format!("{} {}", self.icon, self.name)
    }
}

/// A user-defined category to be created
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub user_id: i64,
    pub name: String,
    pub direction: FlowDirection,
    pub icon: Option<String>,
}

/// What `remove_category` did with the category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRemoval {
    /// No transactions referenced it, the row is gone
    Deleted,
    /// Still referenced, kept but hidden from menus
    Hidden,
}

/// A recorded income or expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub category_icon: String,
    pub direction: FlowDirection,
    /// Positive magnitude; the sign comes from `direction`
    pub amount: Decimal,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.direction.signed(self.amount)
    }
}

/// A transaction to be recorded (before DB insertion)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub category_id: i64,
    pub direction: FlowDirection,
    pub amount: Decimal,
    pub note: Option<String>,
    /// Defaults to now
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewTransaction {
    pub fn new(user_id: i64, category_id: i64, direction: FlowDirection, amount: Decimal) -> Self {
        Self {
            user_id,
            category_id,
            direction,
            amount,
            note: None,
            occurred_at: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }
}

/// Half-open time range `[start, end)` statistics are computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl StatsWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(Error::Validation(format!(
                "Window start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` calendar days ending with `today`, from midnight to midnight.
    ///
    /// Bounds are day-aligned so repeated requests during one day produce the
    /// same window (and hit the same cache entry). A window covers at least
    /// one day.
    pub fn trailing_days(today: NaiveDate, days: u32) -> Self {
        let first = today - Duration::days(i64::from(days.max(1)) - 1);
        let after = today + Duration::days(1);
        Self {
            start: midnight(first),
            end: midnight(after),
        }
    }

    /// `trailing_days` ending today (UTC)
    pub fn last_days(days: u32) -> Self {
        Self::trailing_days(Utc::now().date_naive(), days)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .unwrap_or_default()
}

/// Summed amount for one category inside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub name: String,
    pub icon: String,
    pub direction: FlowDirection,
    /// Signed: positive for income, negative for expense
    pub total: Decimal,
    pub transaction_count: usize,
}

/// Aggregated statistics for one user and window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub window: StatsWindow,
    /// Sum of income amounts (non-negative)
    pub total_income: Decimal,
    /// Sum of expense amounts (non-negative)
    pub total_expense: Decimal,
    pub transaction_count: usize,
    /// Keyed by category id
    pub by_category: BTreeMap<i64, CategoryTotal>,
}

impl StatsSnapshot {
    pub fn empty(window: StatsWindow) -> Self {
        Self {
            window,
            total_income: Decimal::ZERO,
            total_expense: Decimal::ZERO,
            transaction_count: 0,
            by_category: BTreeMap::new(),
        }
    }

    /// Income minus expense
    pub fn net(&self) -> Decimal {
        self.total_income - self.total_expense
    }

    /// Sum of the signed per-category totals; always equals `net()`
    pub fn category_sum(&self) -> Decimal {
        self.by_category.values().map(|c| c.total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_count == 0
    }

    pub fn category_named(&self, name: &str) -> Option<&CategoryTotal> {
        self.by_category.values().find(|c| c.name == name)
    }

    /// Categories of one direction, largest amount first (ties by name)
    pub fn ranked(&self, direction: FlowDirection) -> Vec<&CategoryTotal> {
        let mut totals: Vec<&CategoryTotal> = self
            .by_category
            .values()
            .filter(|c| c.direction == direction)
            .collect();
        totals.sort_by(|a, b| {
            b.total
                .abs()
                .cmp(&a.total.abs())
                .then_with(|| a.name.cmp(&b.name))
        });
        totals
    }
}
