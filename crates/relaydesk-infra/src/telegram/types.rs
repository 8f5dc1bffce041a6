//! Telegram Bot API wire types (the subset the relay reads).

use chrono::{DateTime, Utc};
use relaydesk_types::client::{Client, ClientId};
use relaydesk_types::message::InboundEvent;
use serde::Deserialize;

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    /// Unix seconds.
    pub date: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// Full name if known, else `@username`, else `ID: <id>`.
    pub fn display_name(&self) -> String {
        let full_name = [Some(self.first_name.as_str()), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full_name.is_empty() {
            full_name
        } else if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            format!("@{username}")
        } else {
            Client::fallback_name(ClientId(self.id))
        }
    }
}

impl Update {
    /// Whether the update came from a one-to-one chat with the bot.
    pub fn is_private_chat(&self) -> bool {
        self.message
            .as_ref()
            .is_some_and(|m| m.chat.kind == "private")
    }

    /// Convert a text message into an inbound event keyed by chat id.
    ///
    /// Returns `None` for non-message updates and for media without text.
    pub fn text_event(&self) -> Option<InboundEvent> {
        let message = self.message.as_ref()?;
        let text = message.text.as_ref()?;

        Some(InboundEvent {
            sender_id: ClientId(message.chat.id),
            sender_display_name: message.from.as_ref().map(User::display_name),
            text: text.clone(),
            timestamp: DateTime::<Utc>::from_timestamp(message.date, 0).unwrap_or_else(Utc::now),
        })
    }
}
