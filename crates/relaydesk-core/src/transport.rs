//! Outbound side of the chat-platform adapter.

use relaydesk_types::error::DeliveryError;

/// Sends text to a chat on the platform.
///
/// Implementations perform a single attempt; the relay engine bounds it with
/// a timeout and never retries.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        chat_id: i64,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), DeliveryError>> + Send;
}
