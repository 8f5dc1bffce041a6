//! Minimal Telegram Bot API client: long polling and text delivery.
//!
//! Implements the `Transport` port from `relaydesk-core`. Media, inline
//! keyboards and callback queries are not handled.

use std::time::Duration;

use relaydesk_core::transport::Transport;
use relaydesk_types::error::DeliveryError;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::types::{ApiResponse, Update, User};

/// Bot API base URL; the token is appended as `/bot<token>`.
const API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Timeout for ordinary (non long-poll) requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors from Bot API calls.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("api returned ok without a result")]
    MissingResult,
}

impl From<TelegramError> for DeliveryError {
    fn from(err: TelegramError) -> Self {
        match err {
            TelegramError::Api { description, .. } => DeliveryError::Rejected(description),
            other => DeliveryError::Network(other.to_string()),
        }
    }
}

/// Bot API client bound to one bot token.
#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(API_BASE, token)
    }

    /// Point the client at a different API host (e.g. a local Bot API server).
    pub fn with_base_url(base: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/bot{token}", base.trim_end_matches('/')),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(strip_url)?
            .json()
            .await
            .map_err(strip_url)?;

        if !response.ok {
            return Err(TelegramError::Api {
                code: response.error_code.unwrap_or_default(),
                description: response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        response.result.ok_or(TelegramError::MissingResult)
    }

    /// Identity of the bot behind the token.
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", json!({}), REQUEST_TIMEOUT).await
    }

    /// Remove any configured webhook; a webhook blocks `getUpdates`.
    pub async fn delete_webhook(&self) -> Result<bool, TelegramError> {
        self.call("deleteWebhook", json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-poll for updates with `update_id >= offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
            Duration::from_secs(timeout_secs) + REQUEST_TIMEOUT,
        )
        .await
    }

    /// Send plain text, split into platform-sized chunks.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let _: serde_json::Value = self
                .call(
                    "sendMessage",
                    json!({ "chat_id": chat_id, "text": chunk }),
                    REQUEST_TIMEOUT,
                )
                .await?;
        }
        debug!(chat_id, "message sent");
        Ok(())
    }
}

impl Transport for TelegramClient {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        self.send_message(chat_id, text).await.map_err(Into::into)
    }
}

/// reqwest errors embed the request URL, which contains the bot token.
fn strip_url(err: reqwest::Error) -> TelegramError {
    TelegramError::Http(err.without_url())
}

/// Split text into chunks of at most `max_chars` characters, preferring line
/// boundaries.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > max_chars {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_short_message_untouched() {
        assert_eq!(split_message("hello", 10), vec!["hello".to_string()]);
        assert_eq!(split_message("", 10), vec![String::new()]);
    }

    #[test]
    fn test_split_prefers_line_boundaries() {
        let chunks = split_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_split_long_line_by_chars() {
        let chunks = split_message("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        let text = "ж".repeat(6);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 4);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_api_error_maps_to_rejected() {
        let err = TelegramError::Api {
            code: 403,
            description: "Forbidden: bot was blocked by the user".into(),
        };
        assert_eq!(
            DeliveryError::from(err),
            DeliveryError::Rejected("Forbidden: bot was blocked by the user".into())
        );
    }

    #[test]
    fn test_base_url_contains_token() {
        let client = TelegramClient::with_base_url("http://localhost:8081/", "123:abc");
        assert_eq!(client.base_url, "http://localhost:8081/bot123:abc");
    }
}
