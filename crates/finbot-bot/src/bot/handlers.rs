//! Action dispatch
//!
//! Each [`ActionKind`] maps to one handler in [`HANDLERS`]. Handlers are plain
//! synchronous functions from the current dialog state and action to a reply
//! and the next state; they never talk to Telegram.

use std::str::FromStr;

use finbot_core::{
    CategoryRemoval, Error, FlowDirection, Ledger, Result, StatsWindow, MAX_AMOUNT,
};
use rust_decimal::Decimal;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error};

use super::actions::{Action, ActionKind, Command};
use super::views::{self, Keyboard};

pub const HISTORY_LIMIT: usize = 10;

const STORE_UNAVAILABLE: &str =
    "⚠️ Something went wrong on our side. Please try again later.";

/// Per-chat conversation state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DialogState {
    #[default]
    Idle,
    ChoosingCategory {
        direction: FlowDirection,
    },
    EnteringAmount {
        direction: FlowDirection,
        category_id: i64,
        category_name: String,
    },
}

/// Shared services for all handlers
#[derive(Clone)]
pub struct BotContext {
    pub ledger: Ledger,
    /// Length of the statistics window
    pub window_days: u32,
}

impl BotContext {
    pub fn new(ledger: Ledger, window_days: u32) -> Self {
        Self {
            ledger,
            window_days,
        }
    }

    fn window(&self) -> StatsWindow {
        StatsWindow::last_days(self.window_days)
    }
}

/// One incoming action with who sent it and where their dialog stands
#[derive(Debug, Clone)]
pub struct Request {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub state: DialogState,
    pub action: Action,
}

/// What to send back and the dialog state to continue with
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub text: String,
    pub keyboard: Keyboard,
    pub state: DialogState,
}

impl Outcome {
    fn new(text: impl Into<String>, keyboard: Keyboard, state: DialogState) -> Self {
        Self {
            text: text.into(),
            keyboard,
            state,
        }
    }

    /// Reply with the main menu and return to idle
    fn idle(text: impl Into<String>) -> Self {
        Self::new(text, Keyboard::MainMenu, DialogState::Idle)
    }
}

type Handler = fn(&BotContext, &Request) -> Result<Outcome>;

static HANDLERS: &[(ActionKind, Handler)] = &[
    (ActionKind::Start, start),
    (ActionKind::Help, help),
    (ActionKind::StartIncome, start_income),
    (ActionKind::StartExpense, start_expense),
    (ActionKind::ShowStats, show_stats),
    (ActionKind::ShowBalance, show_balance),
    (ActionKind::ShowHistory, show_history),
    (ActionKind::ShowCategories, show_categories),
    (ActionKind::PickCategory, pick_category),
    (ActionKind::DeleteTransaction, delete_transaction),
    (ActionKind::AddCategory, add_category),
    (ActionKind::ChooseCategoryToRemove, choose_category_to_remove),
    (ActionKind::RemoveCategory, remove_category),
    (ActionKind::Cancel, cancel),
    (ActionKind::MainMenu, main_menu),
    (ActionKind::Text, text),
    (ActionKind::Invalid, invalid),
];

/// Run the handler for the request's action.
///
/// Never fails: mistakes in user input become a corrective reply that keeps
/// the dialog where it was, anything else becomes a "try again later" reply
/// and resets the dialog.
pub fn dispatch(ctx: &BotContext, req: &Request) -> Outcome {
    let kind = req.action.kind();
    debug!(user_id = req.user_id, ?kind, state = ?req.state, "Dispatching action");

    let Some((_, handler)) = HANDLERS.iter().find(|(k, _)| *k == kind) else {
        error!(?kind, "No handler registered");
        return Outcome::idle(STORE_UNAVAILABLE);
    };

    match handler(ctx, req) {
        Ok(outcome) => outcome,
        Err(e) if e.is_user_error() => {
            debug!(user_id = req.user_id, error = %e, "Rejected user input");
            Outcome::new(
                format!("⚠️ {}", user_message(&e)),
                Keyboard::None,
                req.state.clone(),
            )
        }
        Err(e) => {
            error!(user_id = req.user_id, error = %e, "Action failed");
            Outcome::idle(STORE_UNAVAILABLE)
        }
    }
}

/// The message of a user error without the error-kind prefix
fn user_message(e: &Error) -> String {
    match e {
        Error::Validation(msg) | Error::InvalidCategory(msg) | Error::InvalidData(msg) => {
            msg.clone()
        }
        Error::NotFound(what) => format!("{} was not found.", what),
        other => other.to_string(),
    }
}

/// Parse "250", "99,90" or "250 lunch" into an amount and optional note
pub fn parse_amount_input(input: &str) -> Result<(Decimal, Option<String>)> {
    let input = input.trim();
    let (number, note) = match input.split_once(char::is_whitespace) {
        Some((number, note)) => (number, Some(note.trim())),
        None => (input, None),
    };

    let amount = Decimal::from_str(&number.replace(',', ".")).map_err(|_| {
        Error::Validation(format!(
            "'{}' is not a number. Send an amount like 250 or 99.90, optionally followed by a note.",
            number
        ))
    })?;
    if amount.round_dp(2) <= Decimal::ZERO {
        return Err(Error::Validation(
            "The amount must be greater than zero.".to_string(),
        ));
    }
    if amount > MAX_AMOUNT {
        return Err(Error::Validation(format!(
            "The amount must not exceed {}.",
            MAX_AMOUNT
        )));
    }

    let note = note.filter(|n| !n.is_empty()).map(str::to_string);
    Ok((amount, note))
}

fn start(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let is_new = ctx.ledger.register_user(
        req.user_id,
        req.username.as_deref(),
        req.first_name.as_deref(),
    )?;
    Ok(Outcome::idle(views::render_welcome(
        req.first_name.as_deref(),
        is_new,
    )))
}

fn help(_ctx: &BotContext, req: &Request) -> Result<Outcome> {
    Ok(Outcome::new(
        Command::descriptions().to_string(),
        Keyboard::None,
        req.state.clone(),
    ))
}

fn choose_category(ctx: &BotContext, req: &Request, direction: FlowDirection) -> Result<Outcome> {
    let categories = ctx.ledger.list_categories(req.user_id, Some(direction))?;
    let prompt = match direction {
        FlowDirection::Income => "💰 Choose the income category:",
        FlowDirection::Expense => "💸 Choose the expense category:",
    };
    Ok(Outcome::new(
        prompt,
        views::category_keyboard(&categories),
        DialogState::ChoosingCategory { direction },
    ))
}

fn start_income(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    choose_category(ctx, req, FlowDirection::Income)
}

fn start_expense(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    choose_category(ctx, req, FlowDirection::Expense)
}

fn show_stats(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let snapshot = ctx.ledger.compute_stats(req.user_id, &ctx.window())?;
    Ok(Outcome::idle(views::render_stats(&snapshot, ctx.window_days)))
}

fn show_balance(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let balance = ctx.ledger.balance(req.user_id)?;
    let snapshot = ctx.ledger.compute_stats(req.user_id, &ctx.window())?;
    Ok(Outcome::idle(views::render_balance(
        balance,
        &snapshot,
        ctx.window_days,
    )))
}

fn show_history(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let transactions = ctx.ledger.recent_transactions(req.user_id, HISTORY_LIMIT)?;
    Ok(Outcome::new(
        views::render_history(&transactions),
        views::history_keyboard(&transactions),
        DialogState::Idle,
    ))
}

fn show_categories(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let categories = ctx.ledger.list_categories(req.user_id, None)?;
    Ok(Outcome::idle(views::render_categories(&categories)))
}

fn pick_category(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let Action::PickCategory(category_id) = req.action else {
        return Err(Error::InvalidData("Expected a category".to_string()));
    };
    let DialogState::ChoosingCategory { direction } = req.state else {
        return Err(Error::Validation(
            "This menu has expired. Start again from the main menu.".to_string(),
        ));
    };

    let category = ctx.ledger.category(req.user_id, category_id)?;
    if category.hidden || category.direction != direction {
        return Err(Error::InvalidCategory(format!(
            "'{}' cannot be used for {} right now. Pick another category.",
            category.name, direction
        )));
    }

    Ok(Outcome::new(
        format!(
            "{} Enter the amount (e.g. 250 or 99.90, a note may follow: 250 lunch):",
            category.label()
        ),
        views::cancel_keyboard(),
        DialogState::EnteringAmount {
            direction,
            category_id: category.id,
            category_name: category.name,
        },
    ))
}

fn delete_transaction(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let Action::DeleteTransaction(transaction_id) = req.action else {
        return Err(Error::InvalidData("Expected a transaction".to_string()));
    };
    let deleted = ctx.ledger.delete_transaction(req.user_id, transaction_id)?;
    Ok(Outcome::idle(views::render_transaction_deleted(&deleted)))
}

fn add_category(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let Action::AddCategory { direction, name } = &req.action else {
        return Err(Error::InvalidData("Expected a category name".to_string()));
    };
    let category = ctx.ledger.add_category(req.user_id, name, *direction)?;
    Ok(Outcome::idle(format!(
        "✅ Added {} category {}.",
        category.direction,
        category.label()
    )))
}

fn choose_category_to_remove(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let categories = ctx.ledger.list_categories(req.user_id, None)?;
    if categories.iter().all(|c| c.is_global()) {
        return Ok(Outcome::idle(
            "You have no categories of your own. Built-in categories cannot be removed.",
        ));
    }
    Ok(Outcome::new(
        "Which category should be removed?",
        views::removable_keyboard(&categories),
        DialogState::Idle,
    ))
}

fn remove_category(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let Action::RemoveCategory(category_id) = req.action else {
        return Err(Error::InvalidData("Expected a category".to_string()));
    };
    let category = ctx.ledger.category(req.user_id, category_id)?;
    let text = match ctx.ledger.remove_category(req.user_id, category_id)? {
        CategoryRemoval::Deleted => format!("🗑 Removed category {}.", category.label()),
        CategoryRemoval::Hidden => format!(
            "🙈 Category {} is used by past transactions, so it was hidden instead of deleted.",
            category.label()
        ),
    };
    Ok(Outcome::idle(text))
}

fn cancel(_ctx: &BotContext, _req: &Request) -> Result<Outcome> {
    Ok(Outcome::idle("❌ Cancelled."))
}

fn main_menu(_ctx: &BotContext, _req: &Request) -> Result<Outcome> {
    Ok(Outcome::idle("🏠 Main menu"))
}

fn text(ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let Action::Text(input) = &req.action else {
        return Err(Error::InvalidData("Expected text".to_string()));
    };

    match &req.state {
        DialogState::EnteringAmount {
            direction,
            category_id,
            ..
        } => {
            let (amount, note) = parse_amount_input(input)?;
            let tx = ctx.ledger.add_transaction(
                req.user_id,
                *category_id,
                amount,
                *direction,
                note.as_deref(),
            )?;
            Ok(Outcome::idle(views::render_transaction_recorded(&tx)))
        }
        DialogState::ChoosingCategory { .. } => Ok(Outcome::new(
            "Please pick a category with the buttons above, or cancel.",
            Keyboard::None,
            req.state.clone(),
        )),
        DialogState::Idle => Ok(Outcome::idle(
            "I did not understand that. Use the menu below or send /help.",
        )),
    }
}

fn invalid(_ctx: &BotContext, req: &Request) -> Result<Outcome> {
    let Action::Invalid(message) = &req.action else {
        return Err(Error::InvalidData("Expected an error message".to_string()));
    };
    Ok(Outcome::new(message.clone(), Keyboard::None, req.state.clone()))
}
