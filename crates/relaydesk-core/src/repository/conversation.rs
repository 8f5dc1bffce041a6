//! Conversation repository trait definition.
//!
//! Defines the storage interface for clients and their message history.
//! The store is the single source of truth for the relay: the engine keeps
//! no state of its own beyond write locks.

use chrono::{DateTime, Utc};
use relaydesk_types::client::{Client, ClientId};
use relaydesk_types::error::RepositoryError;
use relaydesk_types::message::{Direction, Message};

/// Repository trait for client and message persistence.
///
/// Both write operations must be atomic: a reader never observes a message
/// without the matching client update, or the reverse.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ConversationRepository: Send + Sync {
    /// Create the client if absent, otherwise refresh its display name when a
    /// different non-empty value is supplied.
    fn ensure_client(
        &self,
        id: ClientId,
        display_name: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Client, RepositoryError>> + Send;

    /// Append a message, assigning the next id, and advance the client's
    /// `last_contact_at` to `at` if it is newer. Creates the client if needed.
    fn record_message(
        &self,
        client_id: ClientId,
        direction: Direction,
        text: &str,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Message, RepositoryError>> + Send;

    /// All clients, most recent contact first, ties broken by id ascending.
    fn list_clients(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Client>, RepositoryError>> + Send;

    /// The last `limit` messages of a client in chronological order.
    ///
    /// `None` or a non-positive limit returns the full history.
    fn get_history(
        &self,
        client_id: ClientId,
        limit: Option<i64>,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    fn client_exists(
        &self,
        id: ClientId,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;
}
