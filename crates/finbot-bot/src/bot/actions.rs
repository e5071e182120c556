//! User actions and how they are parsed
//!
//! Everything a user can do arrives as one of three inputs: a slash command,
//! a reply-keyboard label (plain text), or inline-button callback data. All of
//! them are normalised into an [`Action`] before dispatch.

use finbot_core::FlowDirection;
use teloxide::utils::command::BotCommands;

use super::views;

/// Slash commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "show this message")]
    Help,
    #[command(description = "record income")]
    AddIncome,
    #[command(description = "record an expense")]
    AddExpense,
    #[command(description = "statistics for the recent period")]
    Stats,
    #[command(description = "current balance")]
    Balance,
    #[command(description = "recent transactions")]
    History,
    #[command(description = "list categories")]
    Categories,
    #[command(description = "add a category, e.g. /add_category expense Pet food")]
    AddCategory(String),
    #[command(description = "remove one of your categories")]
    RemoveCategory(String),
}

pub const ADD_CATEGORY_USAGE: &str =
    "Usage: /add_category <income|expense> <name>\nExample: /add_category expense Pet food";

const UNKNOWN_COMMAND: &str = "Unknown command. Send /help for the list of commands.";

const CATEGORY_PREFIX: &str = "category:";
const DELETE_PREFIX: &str = "delete:";
const REMOVE_PREFIX: &str = "remove:";
const CANCEL_DATA: &str = "cancel";
const MAIN_MENU_DATA: &str = "main_menu";

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Start,
    Help,
    StartIncome,
    StartExpense,
    ShowStats,
    ShowBalance,
    ShowHistory,
    ShowCategories,
    PickCategory(i64),
    DeleteTransaction(i64),
    AddCategory {
        direction: FlowDirection,
        name: String,
    },
    /// `/remove_category` without an id: offer the removable categories
    ChooseCategoryToRemove,
    RemoveCategory(i64),
    Cancel,
    MainMenu,
    /// Free text: an amount while one is expected, otherwise unrecognised
    Text(String),
    /// Input that looked like a command but could not be understood
    Invalid(String),
}

/// Discriminant of [`Action`], used as the dispatch table key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Start,
    Help,
    StartIncome,
    StartExpense,
    ShowStats,
    ShowBalance,
    ShowHistory,
    ShowCategories,
    PickCategory,
    DeleteTransaction,
    AddCategory,
    ChooseCategoryToRemove,
    RemoveCategory,
    Cancel,
    MainMenu,
    Text,
    Invalid,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Start => ActionKind::Start,
            Self::Help => ActionKind::Help,
            Self::StartIncome => ActionKind::StartIncome,
            Self::StartExpense => ActionKind::StartExpense,
            Self::ShowStats => ActionKind::ShowStats,
            Self::ShowBalance => ActionKind::ShowBalance,
            Self::ShowHistory => ActionKind::ShowHistory,
            Self::ShowCategories => ActionKind::ShowCategories,
            Self::PickCategory(_) => ActionKind::PickCategory,
            Self::DeleteTransaction(_) => ActionKind::DeleteTransaction,
            Self::AddCategory { .. } => ActionKind::AddCategory,
            Self::ChooseCategoryToRemove => ActionKind::ChooseCategoryToRemove,
            Self::RemoveCategory(_) => ActionKind::RemoveCategory,
            Self::Cancel => ActionKind::Cancel,
            Self::MainMenu => ActionKind::MainMenu,
            Self::Text(_) => ActionKind::Text,
            Self::Invalid(_) => ActionKind::Invalid,
        }
    }

    /// Parse an incoming text message.
    ///
    /// `bot_username` lets commands addressed as `/stats@my_bot` parse in groups.
    pub fn from_message(text: &str, bot_username: &str) -> Self {
        let text = text.trim();
        if text.starts_with('/') {
            return match Command::parse(text, bot_username) {
                Ok(cmd) => Self::from_command(cmd),
                Err(_) => Self::Invalid(UNKNOWN_COMMAND.to_string()),
            };
        }
        Self::from_label(text).unwrap_or_else(|| Self::Text(text.to_string()))
    }

    pub fn from_command(cmd: Command) -> Self {
        match cmd {
            Command::Start => Self::Start,
            Command::Help => Self::Help,
            Command::AddIncome => Self::StartIncome,
            Command::AddExpense => Self::StartExpense,
            Command::Stats => Self::ShowStats,
            Command::Balance => Self::ShowBalance,
            Command::History => Self::ShowHistory,
            Command::Categories => Self::ShowCategories,
            Command::AddCategory(args) => parse_add_category(&args),
            Command::RemoveCategory(args) => {
                let args = args.trim();
                if args.is_empty() {
                    Self::ChooseCategoryToRemove
                } else {
                    match args.parse::<i64>() {
                        Ok(id) => Self::RemoveCategory(id),
                        Err(_) => Self::Invalid(
                            "Usage: /remove_category [id]. Send /categories to see the ids."
                                .to_string(),
                        ),
                    }
                }
            }
        }
    }

    /// Map a reply-keyboard label to its action
    pub fn from_label(text: &str) -> Option<Self> {
        let action = match text {
            views::INCOME_LABEL => Self::StartIncome,
            views::EXPENSE_LABEL => Self::StartExpense,
            views::STATS_LABEL => Self::ShowStats,
            views::BALANCE_LABEL => Self::ShowBalance,
            views::HISTORY_LABEL => Self::ShowHistory,
            views::CATEGORIES_LABEL => Self::ShowCategories,
            views::CANCEL_LABEL => Self::Cancel,
            _ => return None,
        };
        Some(action)
    }

    /// Parse inline-button callback data
    pub fn from_callback(data: &str) -> Option<Self> {
        if let Some(id) = data.strip_prefix(CATEGORY_PREFIX) {
            return id.parse().ok().map(Self::PickCategory);
        }
        if let Some(id) = data.strip_prefix(DELETE_PREFIX) {
            return id.parse().ok().map(Self::DeleteTransaction);
        }
        if let Some(id) = data.strip_prefix(REMOVE_PREFIX) {
            return id.parse().ok().map(Self::RemoveCategory);
        }
        match data {
            CANCEL_DATA => Some(Self::Cancel),
            MAIN_MENU_DATA => Some(Self::MainMenu),
            _ => None,
        }
    }

    /// Callback data for actions that can sit behind an inline button
    pub fn callback_data(&self) -> Option<String> {
        match self {
            Self::PickCategory(id) => Some(format!("{}{}", CATEGORY_PREFIX, id)),
            Self::DeleteTransaction(id) => Some(format!("{}{}", DELETE_PREFIX, id)),
            Self::RemoveCategory(id) => Some(format!("{}{}", REMOVE_PREFIX, id)),
            Self::Cancel => Some(CANCEL_DATA.to_string()),
            Self::MainMenu => Some(MAIN_MENU_DATA.to_string()),
            _ => None,
        }
    }
}

/// `<income|expense> <name>`
fn parse_add_category(args: &str) -> Action {
    let Some((direction, name)) = args.trim().split_once(char::is_whitespace) else {
        return Action::Invalid(ADD_CATEGORY_USAGE.to_string());
    };
    let name = name.trim();
    match direction.parse::<FlowDirection>() {
        Ok(direction) if !name.is_empty() => Action::AddCategory {
            direction,
            name: name.to_string(),
        },
        _ => Action::Invalid(ADD_CATEGORY_USAGE.to_string()),
    }
}
