//! Plain-text rendering of relay results for the administrator chat.

use chrono::{DateTime, Utc};
use relaydesk_types::client::{Client, ClientId};
use relaydesk_types::error::RelayError;
use relaydesk_types::message::{Direction, Message};

use crate::command;

use super::engine::AdminReply;

/// Notification forwarded to the administrator for an inbound message.
pub fn inbound_notice(client: &Client, message: &Message) -> String {
    format!(
        "Message from {}\nID: {}\n\n{}",
        client.display_name, client.id, message.text
    )
}

/// Human-friendly distance between `last` and `now`.
pub fn format_age(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last else {
        return "never".to_string();
    };

    let secs = (now - last).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

pub fn client_list(clients: &[Client], total: usize, as_of: DateTime<Utc>) -> String {
    if clients.is_empty() {
        return "No clients yet.".to_string();
    }

    let mut lines = vec!["Clients:".to_string()];
    for client in clients {
        lines.push(format!(
            "• {} (ID: {}) - last contact {}",
            client.display_name,
            client.id,
            format_age(client.last_contact_at, as_of)
        ));
    }
    if total > clients.len() {
        lines.push(format!("...and {} more", total - clients.len()));
    }
    lines.join("\n")
}

pub fn transcript(client_id: ClientId, messages: &[Message]) -> String {
    if messages.is_empty() {
        return format!("History with client {client_id} is empty.");
    }

    let mut lines = vec![format!(
        "History with client {client_id} (last {}):",
        messages.len()
    )];
    for message in messages {
        let author = match message.direction {
            Direction::Inbound => "<< client",
            Direction::Outbound => ">> you",
        };
        lines.push(format!(
            "[{}] {author}: {}",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.text
        ));
    }
    lines.join("\n")
}

/// Text answering a successfully handled administrator message.
pub fn reply(reply: &AdminReply) -> String {
    match reply {
        AdminReply::Delivered(message) => {
            format!("Message sent to client {}.", message.client_id)
        }
        AdminReply::Clients {
            clients,
            total,
            as_of,
        } => client_list(clients, *total, *as_of),
        AdminReply::Transcript {
            client_id,
            messages,
        } => transcript(*client_id, messages),
        AdminReply::NotACommand => command::usage().to_string(),
    }
}

/// Text telling the administrator why a command did not fully succeed.
pub fn error_notice(error: &RelayError) -> String {
    match error {
        RelayError::UnknownClient(id) => format!("Unknown client {id}. Nothing was sent."),
        RelayError::MalformedCommand(reason) => {
            format!("Malformed command: {reason}\n\n{}", command::usage())
        }
        RelayError::Delivery { message_id, source } => {
            format!("Message #{message_id} was saved but NOT delivered: {source}")
        }
        RelayError::Storage(e) => format!("Storage failure, operation aborted: {e}"),
    }
}
