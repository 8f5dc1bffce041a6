//! Long-poll dispatcher feeding platform updates into the relay engine.
//!
//! Each batch from `getUpdates` is handled in arrival order. Client events
//! between two administrator events are grouped per client and every group
//! runs in its own task, so one slow client never delays another while
//! messages from the same client keep their order. An administrator event
//! runs only after all client events before it are stored.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use relaydesk_core::relay::render;
use relaydesk_core::relay::{AdminReply, RelayEngine};
use relaydesk_core::repository::conversation::ConversationRepository;
use relaydesk_core::transport::Transport;
use relaydesk_infra::telegram::TelegramClient;
use relaydesk_infra::telegram::types::Update;
use relaydesk_types::client::ClientId;
use relaydesk_types::error::RelayError;
use relaydesk_types::message::InboundEvent;
use tokio_util::sync::CancellationToken;

/// Pause after a failed `getUpdates` call before polling again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// One relevant update, already routed by origin.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Admin { text: String, at: DateTime<Utc> },
    Client(InboundEvent),
}

/// Route an update by origin. Returns `None` for updates the relay ignores:
/// non-text messages and non-private chats other than the administrator's.
pub fn classify(update: &Update, admin_chat_id: i64) -> Option<Incoming> {
    let event = update.text_event()?;

    if event.sender_id.get() == admin_chat_id {
        return Some(Incoming::Admin {
            text: event.text,
            at: event.timestamp,
        });
    }

    if !update.is_private_chat() {
        tracing::debug!(chat_id = %event.sender_id, "ignoring non-private chat");
        return None;
    }

    Some(Incoming::Client(event))
}

/// Group client events by sender, keeping first-seen sender order and the
/// arrival order inside each group.
pub fn group_by_client(events: Vec<InboundEvent>) -> Vec<Vec<InboundEvent>> {
    let mut index: HashMap<ClientId, usize> = HashMap::new();
    let mut groups: Vec<Vec<InboundEvent>> = Vec::new();

    for event in events {
        match index.get(&event.sender_id) {
            Some(&i) => groups[i].push(event),
            None => {
                index.insert(event.sender_id, groups.len());
                groups.push(vec![event]);
            }
        }
    }
    groups
}

/// Whether a client's text is the platform's conversation-start command.
fn is_start_command(text: &str) -> bool {
    let head = text.split_whitespace().next().unwrap_or_default();
    let keyword = head.split('@').next().unwrap_or_default();
    keyword.eq_ignore_ascii_case("/start")
}

/// Drives a [`RelayEngine`] from batches of incoming events.
pub struct Dispatcher<R: ConversationRepository, T: Transport> {
    engine: Arc<RelayEngine<R, T>>,
    greeting: Arc<str>,
}

impl<R, T> Dispatcher<R, T>
where
    R: ConversationRepository + 'static,
    T: Transport + 'static,
{
    pub fn new(engine: Arc<RelayEngine<R, T>>, greeting: impl Into<Arc<str>>) -> Self {
        Self {
            engine,
            greeting: greeting.into(),
        }
    }

    /// Poll until `cancel` fires or a storage failure occurs.
    ///
    /// A storage failure is returned as an error so the process exits and
    /// its supervisor can restart it. Updates of the failing batch are not
    /// acknowledged and will be delivered again after the restart.
    pub async fn run(
        &self,
        source: &TelegramClient,
        poll_timeout_secs: u64,
        cancel: CancellationToken,
    ) -> Result<(), RelayError> {
        let mut offset = 0i64;

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = source.get_updates(offset, poll_timeout_secs) => polled,
            };

            let updates = match polled {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => continue,
                    }
                }
            };

            if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                offset = last + 1;
            }

            let batch: Vec<Incoming> = updates
                .iter()
                .filter_map(|u| classify(u, self.engine.admin_chat_id()))
                .collect();

            if !batch.is_empty() {
                tracing::debug!(updates = updates.len(), events = batch.len(), "processing batch");
                self.handle_batch(batch).await?;
            }
        }

        // Acknowledge everything handled so far so a restart does not replay it.
        if offset > 0 {
            if let Err(e) = source.get_updates(offset, 0).await {
                tracing::warn!(error = %e, "failed to acknowledge final updates");
            }
        }

        tracing::info!("poller stopped");
        Ok(())
    }

    /// Handle one batch in arrival order.
    ///
    /// Client events between two administrator events run as concurrent
    /// per-client groups; every group finishes before the next administrator
    /// event is handled, so a command always sees the messages that preceded
    /// it. Returns the first storage failure; every other error has already
    /// been reported to the administrator or logged.
    pub async fn handle_batch(&self, batch: Vec<Incoming>) -> Result<(), RelayError> {
        let mut pending = Vec::new();
        for incoming in batch {
            match incoming {
                Incoming::Client(event) => pending.push(event),
                Incoming::Admin { text, at } => {
                    self.run_client_groups(std::mem::take(&mut pending)).await?;
                    self.handle_admin(&text, at).await?;
                }
            }
        }
        self.run_client_groups(pending).await
    }

    /// Run client events grouped per client and wait for all groups.
    async fn run_client_groups(&self, events: Vec<InboundEvent>) -> Result<(), RelayError> {
        if events.is_empty() {
            return Ok(());
        }

        let tasks: Vec<_> = group_by_client(events)
            .into_iter()
            .map(|group| {
                let engine = Arc::clone(&self.engine);
                let greeting = Arc::clone(&self.greeting);
                tokio::spawn(async move {
                    for event in group {
                        handle_client(&engine, &greeting, event).await?;
                    }
                    Ok::<(), RelayError>(())
                })
            })
            .collect();

        let mut outcome = Ok(());
        for joined in futures_util::future::join_all(tasks).await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if outcome.is_ok() {
                        outcome = Err(e);
                    }
                }
                Err(e) => tracing::error!(error = %e, "client task panicked"),
            }
        }
        outcome
    }

    async fn handle_admin(&self, text: &str, at: DateTime<Utc>) -> Result<(), RelayError> {
        let notice = match self.engine.on_admin_text(text, at).await {
            Ok(AdminReply::NotACommand) if text.trim_start().starts_with('/') => {
                Some(render::reply(&AdminReply::NotACommand))
            }
            Ok(AdminReply::NotACommand) => None,
            Ok(reply) => Some(render::reply(&reply)),
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "storage failure while handling administrator command");
                if let Err(delivery) = self.engine.notify_admin(&render::error_notice(&e)).await {
                    tracing::warn!(error = %delivery, "failed to report storage failure to administrator");
                }
                return Err(e);
            }
            Err(e) => {
                tracing::info!(error = %e, "administrator command not completed");
                Some(render::error_notice(&e))
            }
        };

        if let Some(notice) = notice {
            if let Err(e) = self.engine.notify_admin(&notice).await {
                tracing::warn!(error = %e, "failed to answer administrator");
            }
        }
        Ok(())
    }
}

async fn handle_client<R: ConversationRepository, T: Transport>(
    engine: &RelayEngine<R, T>,
    greeting: &str,
    event: InboundEvent,
) -> Result<(), RelayError> {
    match engine
        .on_client_message(
            event.sender_id,
            event.sender_display_name.as_deref(),
            &event.text,
            event.timestamp,
        )
        .await
    {
        // Forwarding failures were logged by the engine; the client is not told.
        Ok(_) | Err(RelayError::Delivery { .. }) => {}
        Err(e) if e.is_fatal() => {
            tracing::error!(client_id = %event.sender_id, error = %e, "storage failure on inbound message");
            return Err(e);
        }
        Err(e) => tracing::warn!(client_id = %event.sender_id, error = %e, "inbound message rejected"),
    }

    if is_start_command(&event.text) && !greeting.is_empty() {
        if let Err(e) = engine.send_service_text(event.sender_id, greeting).await {
            tracing::warn!(client_id = %event.sender_id, error = %e, "greeting not delivered");
        }
    }
    Ok(())
}
