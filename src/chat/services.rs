use anyhow::Context;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::repo_types::ChatMessage;
use crate::state::{AppState, Session};

#[instrument(skip(state, display_name))]
pub async fn send_message(
    state: &AppState,
    session: &Session,
    chat_id: &str,
    display_name: &str,
    sent_at: i64,
) -> anyhow::Result<ChatMessage> {
    let message = ChatMessage {
        id: Uuid::new_v4(),
        chat_id: chat_id.to_string(),
        sender: session.user_id.clone(),
        display_name: display_name.to_string(),
        sent_at,
    };
    state
        .stores
        .messages
        .insert(&message)
        .await
        .context("insert chat message")?;
    debug!(message_id = %message.id, "chat message stored");
    Ok(message)
}

/// The user's messages, oldest first.
pub async fn messages_for(state: &AppState, user_id: &str) -> anyhow::Result<Vec<ChatMessage>> {
    state
        .stores
        .messages
        .list_for_sender(user_id)
        .await
        .context("list chat messages")
}

/// Deletes the session user's messages sent strictly before `now`.
#[instrument(skip(state))]
pub async fn delete_past_messages(
    state: &AppState,
    session: &Session,
    now: i64,
) -> anyhow::Result<u64> {
    let deleted = state
        .stores
        .messages
        .delete_sent_before(&session.user_id, now)
        .await
        .context("delete past chat messages")?;
    info!(deleted, "past chat messages swept");
    Ok(deleted)
}
