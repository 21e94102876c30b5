//! Telegram update handlers.
//!
//! Each inbound message is converted into a `relay-core` `IncomingUpdate` and
//! handed to the message router. The router returns as soon as the user has
//! been acknowledged; the work itself runs in spawned tasks.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use relay_core::{
    domain::{ChatId, MessageId, UserId},
    messaging::types::{Command, IncomingUpdate, TextMessage},
};

use crate::router::AppState;

mod commands;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(update) = to_incoming(&msg) else {
        return Ok(());
    };

    // Transport failures end this update only; the dispatcher keeps polling.
    if let Err(e) = state.router.dispatch(update).await {
        tracing::error!(chat_id = msg.chat.id.0, "failed to handle message: {e}");
    }
    Ok(())
}

/// Map a Telegram message onto the core update model.
///
/// Non-text messages and messages without a sender are ignored. Unknown slash
/// commands are plain text.
fn to_incoming(msg: &Message) -> Option<IncomingUpdate> {
    let text = msg.text()?;
    let user = msg.from()?;

    let chat_id = ChatId(msg.chat.id.0);
    let message_id = MessageId(msg.id.0);

    if let Some(kind) = commands::parse_command(text) {
        return Some(IncomingUpdate::Command(Command {
            chat_id,
            message_id,
            kind,
        }));
    }

    Some(IncomingUpdate::Text(TextMessage {
        chat_id,
        message_id,
        user_id: UserId(user.id.0 as i64),
        username: user.username.clone(),
        text: text.to_string(),
    }))
}
