//! Client identity types for Relaydesk.
//!
//! A client is an external party talking to the administrator through the
//! relay. Its identifier is the chat-platform id and never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Stable chat-platform identifier of a client.
///
/// Telegram chat ids are signed 64-bit integers (group chats are negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i64);

impl ClientId {
    /// The raw platform id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A known client.
///
/// Created the first time a message referencing it is recorded. The
/// `display_name` is refreshed whenever a newer value arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    /// Best-known human-readable label.
    pub display_name: String,
    /// Timestamp of the newest message in either direction, `None` until the
    /// first message is recorded.
    pub last_contact_at: Option<DateTime<Utc>>,
}

impl Client {
    /// Label used when nothing better is known about a client.
    pub fn fallback_name(id: ClientId) -> String {
        format!("ID: {id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_parse() {
        assert_eq!("42".parse::<ClientId>().unwrap(), ClientId(42));
        assert_eq!(" -100123 ".parse::<ClientId>().unwrap(), ClientId(-100123));
        assert!("abc".parse::<ClientId>().is_err());
        assert!("".parse::<ClientId>().is_err());
    }

    #[test]
    fn test_client_id_serde_transparent() {
        let json = serde_json::to_string(&ClientId(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(Client::fallback_name(ClientId(99)), "ID: 99");
    }
}
