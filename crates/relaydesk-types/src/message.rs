//! Relayed message types for Relaydesk.
//!
//! Every message that passes through the relay is recorded as an immutable,
//! append-only `Message` row before any delivery is attempted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::client::ClientId;

/// Which way a message travelled.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (direction IN ('inbound', 'outbound'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to administrator.
    Inbound,
    /// Administrator to client.
    Outbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inbound => write!(f, "inbound"),
            Direction::Outbound => write!(f, "outbound"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inbound" => Ok(Direction::Inbound),
            "outbound" => Ok(Direction::Outbound),
            other => Err(format!("invalid message direction: '{other}'")),
        }
    }
}

/// A recorded message.
///
/// For a fixed client, messages are totally ordered by `(created_at, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned, monotonically increasing id.
    pub id: i64,
    pub client_id: ClientId,
    pub direction: Direction,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// An inbound event handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender_id: ClientId,
    pub sender_display_name: Option<String>,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_roundtrip() {
        for direction in [Direction::Inbound, Direction::Outbound] {
            let parsed: Direction = direction.to_string().parse().unwrap();
            assert_eq!(direction, parsed);
        }
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_serde() {
        let json = serde_json::to_string(&Direction::Outbound).unwrap();
        assert_eq!(json, "\"outbound\"");
    }
}
