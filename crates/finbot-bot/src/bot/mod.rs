//! Telegram bot
//!
//! - `actions` - Commands, keyboard labels and callback data parsed into actions
//! - `handlers` - Dialog state and the action dispatch table
//! - `views` - Message texts and keyboards
//! - `telegram` - teloxide dispatcher and reply markup

pub mod actions;
pub mod handlers;
pub mod telegram;
pub mod views;

pub use actions::{Action, ActionKind, Command};
pub use handlers::{dispatch, BotContext, DialogState, Outcome, Request};
pub use views::Keyboard;
