//! Relay engine: client -> administrator forwarding and administrator command
//! dispatch.
//!
//! Every flow persists first and delivers second. A delivery failure never
//! rolls back the write; it is returned as `RelayError::Delivery` carrying the
//! id of the stored message. Writes for one client are serialized through a
//! per-client lock that is released before any network call starts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use relaydesk_types::client::{Client, ClientId};
use relaydesk_types::config::RelayConfig;
use relaydesk_types::error::{DeliveryError, RelayError};
use relaydesk_types::message::{Direction, Message};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::command::{Command, CommandRouter};
use crate::repository::conversation::ConversationRepository;
use crate::transport::Transport;

use super::render;

/// Successful outcome of an administrator message.
#[derive(Debug, Clone, PartialEq)]
pub enum AdminReply {
    /// A `/reply` was stored and delivered.
    Delivered(Message),
    /// `/clients`: at most `client_list_limit` clients out of `total`.
    Clients {
        clients: Vec<Client>,
        total: usize,
        as_of: DateTime<Utc>,
    },
    /// `/history`: chronological transcript.
    Transcript {
        client_id: ClientId,
        messages: Vec<Message>,
    },
    /// The text was not a relay command. Nothing was stored or forwarded.
    NotACommand,
}

/// Held per-client write lock. Dropping it releases the lock and removes the
/// map entry once no other task holds or awaits it.
struct ClientLock<'a> {
    locks: &'a DashMap<ClientId, Arc<Mutex<()>>>,
    client_id: ClientId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ClientLock<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.client_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Orchestrates the conversation store and the chat-platform transport.
///
/// Generic over repository and transport traits to maintain clean
/// architecture -- relaydesk-core never depends on relaydesk-infra.
pub struct RelayEngine<R: ConversationRepository, T: Transport> {
    repo: R,
    transport: T,
    admin_chat_id: i64,
    router: CommandRouter,
    delivery_timeout: Duration,
    client_list_limit: usize,
    write_locks: DashMap<ClientId, Arc<Mutex<()>>>,
}

impl<R: ConversationRepository, T: Transport> RelayEngine<R, T> {
    /// Create a new RelayEngine.
    ///
    /// - `admin_chat_id`: the single chat allowed to issue commands and
    ///   receive forwarded client messages
    /// - `config`: history defaults, delivery timeout, list limit
    pub fn new(repo: R, transport: T, admin_chat_id: i64, config: &RelayConfig) -> Self {
        Self {
            repo,
            transport,
            admin_chat_id,
            router: CommandRouter::new(config.history_default_count, config.history_max_count),
            delivery_timeout: config.delivery_timeout(),
            client_list_limit: config.client_list_limit,
            write_locks: DashMap::new(),
        }
    }

    /// Override the delivery timeout.
    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn admin_chat_id(&self) -> i64 {
        self.admin_chat_id
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    async fn lock_client(&self, client_id: ClientId) -> ClientLock<'_> {
        let lock = self.write_locks.entry(client_id).or_default().clone();
        ClientLock {
            locks: &self.write_locks,
            client_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Single bounded delivery attempt.
    async fn deliver(&self, chat_id: i64, text: &str) -> Result<(), DeliveryError> {
        match tokio::time::timeout(self.delivery_timeout, self.transport.send(chat_id, text)).await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(self.delivery_timeout)),
        }
    }

    /// Record an inbound client message and forward it to the administrator.
    ///
    /// Returns the stored message. If forwarding fails the message stays
    /// stored, the failure is logged, and `RelayError::Delivery` is returned;
    /// the client is never told.
    pub async fn on_client_message(
        &self,
        client_id: ClientId,
        display_name_hint: Option<&str>,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, RelayError> {
        let (client, message) = {
            let _guard = self.lock_client(client_id).await;
            let client = self.repo.ensure_client(client_id, display_name_hint).await?;
            let message = self
                .repo
                .record_message(client_id, Direction::Inbound, text, at)
                .await?;
            (client, message)
        };

        tracing::info!(client_id = %client_id, message_id = message.id, "client message recorded");

        let notice = render::inbound_notice(&client, &message);
        if let Err(source) = self.deliver(self.admin_chat_id, &notice).await {
            tracing::error!(
                client_id = %client_id,
                message_id = message.id,
                error = %source,
                "failed to forward client message to administrator"
            );
            return Err(RelayError::Delivery {
                message_id: message.id,
                source,
            });
        }

        Ok(message)
    }

    /// Interpret one line of administrator text.
    ///
    /// `at` is both the timestamp for an outbound reply and the reference
    /// time for rendering contact ages.
    pub async fn on_admin_text(
        &self,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<AdminReply, RelayError> {
        match self.router.parse(text) {
            Command::Reply { client_id, text } => self.reply(client_id, &text, at).await,
            Command::ListClients => self.list_clients(at).await,
            Command::FetchHistory { client_id, count } => self.history(client_id, count).await,
            Command::Unrecognized => Ok(AdminReply::NotACommand),
            Command::Malformed { reason } => Err(RelayError::MalformedCommand(reason)),
        }
    }

    async fn reply(
        &self,
        client_id: ClientId,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<AdminReply, RelayError> {
        let message = {
            let _guard = self.lock_client(client_id).await;
            if !self.repo.client_exists(client_id).await? {
                return Err(RelayError::UnknownClient(client_id));
            }
            self.repo
                .record_message(client_id, Direction::Outbound, text, at)
                .await?
        };

        if let Err(source) = self.deliver(client_id.get(), text).await {
            tracing::warn!(
                client_id = %client_id,
                message_id = message.id,
                error = %source,
                "reply stored but not delivered"
            );
            return Err(RelayError::Delivery {
                message_id: message.id,
                source,
            });
        }

        tracing::info!(client_id = %client_id, message_id = message.id, "reply delivered");
        Ok(AdminReply::Delivered(message))
    }

    async fn list_clients(&self, as_of: DateTime<Utc>) -> Result<AdminReply, RelayError> {
        let mut clients = self.repo.list_clients().await?;
        let total = clients.len();
        clients.truncate(self.client_list_limit);
        Ok(AdminReply::Clients {
            clients,
            total,
            as_of,
        })
    }

    async fn history(&self, client_id: ClientId, count: u32) -> Result<AdminReply, RelayError> {
        if !self.repo.client_exists(client_id).await? {
            return Err(RelayError::UnknownClient(client_id));
        }
        let messages = self
            .repo
            .get_history(client_id, Some(i64::from(count)))
            .await?;
        Ok(AdminReply::Transcript {
            client_id,
            messages,
        })
    }

    /// Send text to the administrator chat (command results, notices).
    pub async fn notify_admin(&self, text: &str) -> Result<(), DeliveryError> {
        self.deliver(self.admin_chat_id, text).await
    }

    /// Send unrecorded service text (e.g. the greeting) to a client.
    pub async fn send_service_text(
        &self,
        client_id: ClientId,
        text: &str,
    ) -> Result<(), DeliveryError> {
        self.deliver(client_id.get(), text).await
    }
}
