//! Message texts and keyboards
//!
//! Rendering is kept free of Telegram types so it can be tested directly;
//! `telegram` turns a [`Keyboard`] into reply markup.

use finbot_core::{Category, FlowDirection, StatsSnapshot, Transaction};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::actions::Action;

// Reply-keyboard labels
pub const INCOME_LABEL: &str = "💰 Income";
pub const EXPENSE_LABEL: &str = "💸 Expense";
pub const STATS_LABEL: &str = "📊 Statistics";
pub const BALANCE_LABEL: &str = "💳 Balance";
pub const HISTORY_LABEL: &str = "🧾 History";
pub const CATEGORIES_LABEL: &str = "🗂 Categories";
pub const CANCEL_LABEL: &str = "❌ Cancel";
pub const MAIN_MENU_LABEL: &str = "🏠 Main menu";

/// Rows of the persistent reply keyboard
pub const MAIN_MENU: &[&[&str]] = &[
    &[INCOME_LABEL, EXPENSE_LABEL],
    &[STATS_LABEL, BALANCE_LABEL],
    &[HISTORY_LABEL, CATEGORIES_LABEL],
];

const BAR_WIDTH: usize = 10;
const CATEGORY_BUTTONS_PER_ROW: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Keyboard attached to a reply
#[derive(Debug, Clone, PartialEq)]
pub enum Keyboard {
    /// Leave whatever keyboard the chat currently shows
    None,
    /// The persistent reply keyboard with the main actions
    MainMenu,
    /// Inline buttons under the message
    Inline(Vec<Vec<Button>>),
}

pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Amount with an explicit sign, e.g. `+800.00` or `-200.00`
pub fn format_signed(amount: Decimal) -> String {
    if amount >= Decimal::ZERO {
        format!("+{}", format_amount(amount))
    } else {
        format!("-{}", format_amount(amount.abs()))
    }
}

fn direction_icon(direction: FlowDirection) -> &'static str {
    match direction {
        FlowDirection::Income => "💰",
        FlowDirection::Expense => "💸",
    }
}

/// Percentage of `part` in `whole`, one decimal place
pub fn share(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part.abs() / whole.abs() * Decimal::ONE_HUNDRED).round_dp(1)
}

/// Text bar for a percentage, `BAR_WIDTH` cells wide
pub fn bar(percent: Decimal) -> String {
    let filled = (percent / Decimal::TEN)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_usize()
        .unwrap_or(0)
        .min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

pub fn render_welcome(first_name: Option<&str>, is_new: bool) -> String {
    let name = first_name.unwrap_or("there");
    if is_new {
        format!(
            "👋 Hi, {}! I will help you keep track of your income and expenses.\n\n\
             Use the buttons below to record a transaction or look at your statistics. \
             Send /help for the full list of commands.",
            name
        )
    } else {
        format!("👋 Welcome back, {}! What would you like to do?", name)
    }
}

pub fn render_stats(snapshot: &StatsSnapshot, days: u32) -> String {
    if snapshot.is_empty() {
        return format!(
            "📊 No transactions in the last {} days yet.\n\
             Record one with {} or {}.",
            days, INCOME_LABEL, EXPENSE_LABEL
        );
    }

    let mut text = format!("📊 Statistics for the last {} days\n\n", days);
    text.push_str(&format!(
        "💰 Income: {}\n",
        format_amount(snapshot.total_income)
    ));
    text.push_str(&format!(
        "💸 Expense: {}\n",
        format_amount(snapshot.total_expense)
    ));
    text.push_str(&format!("📈 Net: {}\n", format_signed(snapshot.net())));

    for (direction, whole, heading) in [
        (FlowDirection::Income, snapshot.total_income, "Income by category"),
        (FlowDirection::Expense, snapshot.total_expense, "Expense by category"),
    ] {
        let ranked = snapshot.ranked(direction);
        if ranked.is_empty() {
            continue;
        }
        text.push_str(&format!("\n{}:\n", heading));
        for total in ranked {
            let percent = share(total.total, whole);
            text.push_str(&format!(
                "{} {}: {} ({}%)\n{}\n",
                total.icon,
                total.name,
                format_amount(total.total.abs()),
                percent,
                bar(percent)
            ));
        }
    }

    text.trim_end().to_string()
}

pub fn render_balance(balance: Decimal, snapshot: &StatsSnapshot, days: u32) -> String {
    format!(
        "💳 Balance: {}\n\nLast {} days: {} income, {} expense ({})",
        format_signed(balance),
        days,
        format_amount(snapshot.total_income),
        format_amount(snapshot.total_expense),
        format_signed(snapshot.net())
    )
}

fn render_transaction_line(tx: &Transaction) -> String {
    let mut line = format!(
        "#{} {} {} {} {} {}",
        tx.id,
        tx.occurred_at.format("%Y-%m-%d"),
        direction_icon(tx.direction),
        tx.category_icon,
        tx.category_name,
        format_signed(tx.signed_amount())
    );
    if let Some(note) = &tx.note {
        line.push_str(&format!(" · {}", note));
    }
    line
}

pub fn render_history(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "🧾 No transactions yet.".to_string();
    }

    let mut text = format!(
        "🧾 Last {} transactions (tap a button to delete one):\n\n",
        transactions.len()
    );
    for tx in transactions {
        text.push_str(&render_transaction_line(tx));
        text.push('\n');
    }
    text.trim_end().to_string()
}

pub fn history_keyboard(transactions: &[Transaction]) -> Keyboard {
    if transactions.is_empty() {
        return Keyboard::MainMenu;
    }
    let rows = transactions
        .iter()
        .map(|tx| {
            vec![Button::new(
                format!("🗑 #{} {}", tx.id, format_signed(tx.signed_amount())),
                Action::DeleteTransaction(tx.id),
            )]
        })
        .collect();
    Keyboard::Inline(rows)
}

pub fn render_transaction_recorded(tx: &Transaction) -> String {
    let verb = match tx.direction {
        FlowDirection::Income => "Income",
        FlowDirection::Expense => "Expense",
    };
    let mut text = format!(
        "✅ {} of {} recorded in {} {}.",
        verb,
        format_amount(tx.amount),
        tx.category_icon,
        tx.category_name
    );
    if let Some(note) = &tx.note {
        text.push_str(&format!("\nNote: {}", note));
    }
    text
}

pub fn render_transaction_deleted(tx: &Transaction) -> String {
    format!("🗑 Deleted: {}", render_transaction_line(tx))
}

pub fn render_categories(categories: &[Category]) -> String {
    let mut text = String::from("🗂 Categories\n");
    for (direction, heading) in [
        (FlowDirection::Income, "Income"),
        (FlowDirection::Expense, "Expense"),
    ] {
        text.push_str(&format!("\n{}:\n", heading));
        for category in categories.iter().filter(|c| c.direction == direction) {
            if category.is_global() {
                text.push_str(&format!("{}\n", category.label()));
            } else {
                text.push_str(&format!("{} (#{}, yours)\n", category.label(), category.id));
            }
        }
    }
    text.push_str("\nAdd your own with /add_category <income|expense> <name>.");
    text
}

/// Inline keyboard listing categories to pick from, with cancel/menu buttons
pub fn category_keyboard(categories: &[Category]) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = categories
        .chunks(CATEGORY_BUTTONS_PER_ROW)
        .map(|chunk| {
            chunk
                .iter()
                .map(|c| Button::new(c.label(), Action::PickCategory(c.id)))
                .collect()
        })
        .collect();
    rows.push(vec![
        Button::new(CANCEL_LABEL, Action::Cancel),
        Button::new(MAIN_MENU_LABEL, Action::MainMenu),
    ]);
    Keyboard::Inline(rows)
}

/// One button per user-defined category
pub fn removable_keyboard(categories: &[Category]) -> Keyboard {
    let mut rows: Vec<Vec<Button>> = categories
        .iter()
        .filter(|c| !c.is_global())
        .map(|c| {
            vec![Button::new(
                format!("🗑 {} ({})", c.label(), c.direction),
                Action::RemoveCategory(c.id),
            )]
        })
        .collect();
    rows.push(vec![Button::new(CANCEL_LABEL, Action::Cancel)]);
    Keyboard::Inline(rows)
}

pub fn cancel_keyboard() -> Keyboard {
    Keyboard::Inline(vec![vec![Button::new(CANCEL_LABEL, Action::Cancel)]])
}
