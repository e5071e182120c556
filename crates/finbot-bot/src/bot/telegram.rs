//! Telegram transport: long polling, dialogues and reply markup

use std::sync::Arc;

use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, ChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton,
    KeyboardMarkup, Message, Update, User,
};
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use super::actions::{Action, Command};
use super::handlers::{dispatch, BotContext, DialogState, Outcome, Request};
use super::views::{Button, Keyboard, MAIN_MENU};

type FinDialogue = Dialogue<DialogState, InMemStorage<DialogState>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Handler context plus what is only known once connected
struct Runtime {
    ctx: BotContext,
    bot_username: String,
}

fn main_menu_markup() -> KeyboardMarkup {
    KeyboardMarkup::new(
        MAIN_MENU
            .iter()
            .map(|row| row.iter().map(|label| KeyboardButton::new(*label)).collect::<Vec<_>>()),
    )
}

fn inline_markup(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .filter_map(|button| {
                button
                    .action
                    .callback_data()
                    .map(|data| InlineKeyboardButton::callback(button.label.clone(), data))
            })
            .collect::<Vec<_>>()
    }))
}

async fn send_outcome(bot: &Bot, chat_id: ChatId, outcome: &Outcome) -> HandlerResult {
    let request = bot.send_message(chat_id, outcome.text.clone());
    match &outcome.keyboard {
        Keyboard::None => request.await?,
        Keyboard::MainMenu => request.reply_markup(main_menu_markup()).await?,
        Keyboard::Inline(rows) => request.reply_markup(inline_markup(rows)).await?,
    };
    Ok(())
}

fn build_request(user: &User, state: DialogState, action: Action) -> Request {
    Request {
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        state,
        action,
    }
}

async fn handle(
    bot: &Bot,
    dialogue: &FinDialogue,
    chat_id: ChatId,
    runtime: &Runtime,
    request: Request,
) -> HandlerResult {
    let outcome = dispatch(&runtime.ctx, &request);
    if outcome.state != request.state {
        dialogue.update(outcome.state.clone()).await?;
    }
    send_outcome(bot, chat_id, &outcome).await
}

async fn on_message(
    bot: Bot,
    dialogue: FinDialogue,
    state: DialogState,
    msg: Message,
    runtime: Arc<Runtime>,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send text or use the menu buttons.")
            .await?;
        return Ok(());
    };

    let action = Action::from_message(text, &runtime.bot_username);
    let request = build_request(user, state, action);
    handle(&bot, &dialogue, msg.chat.id, &runtime, request).await
}

/// The chat holding the pressed button; the dialogue is keyed by it too.
/// Buttons on inline-mode messages have no chat, so answer privately.
pub(crate) fn reply_chat(q: &CallbackQuery) -> ChatId {
    q.message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id))
}

async fn on_callback(
    bot: Bot,
    dialogue: FinDialogue,
    state: DialogState,
    q: CallbackQuery,
    runtime: Arc<Runtime>,
) -> HandlerResult {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(action) = q.data.as_deref().and_then(Action::from_callback) else {
        warn!(data = ?q.data, "Ignoring unknown callback data");
        return Ok(());
    };
    let chat_id = reply_chat(&q);
    let request = build_request(&q.from, state, action);
    handle(&bot, &dialogue, chat_id, &runtime, request).await
}

/// Poll Telegram until interrupted
pub async fn run(bot: Bot, ctx: BotContext) -> anyhow::Result<()> {
    let me = bot.get_me().await?;
    info!(username = %me.username(), "Connected to Telegram");

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Could not register the command list");
    }

    let runtime = Arc::new(Runtime {
        ctx,
        bot_username: me.username().to_string(),
    });

    let schema = dptree::entry()
        .branch(
            Update::filter_message()
                .enter_dialogue::<Message, InMemStorage<DialogState>, DialogState>()
                .endpoint(on_message),
        )
        .branch(
            Update::filter_callback_query()
                .enter_dialogue::<CallbackQuery, InMemStorage<DialogState>, DialogState>()
                .endpoint(on_callback),
        );

    Dispatcher::builder(bot, schema)
        .dependencies(dptree::deps![InMemStorage::<DialogState>::new(), runtime])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}
