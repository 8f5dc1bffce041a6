use std::time::Duration;

use thiserror::Error;

use crate::client::ClientId;

/// Errors from repository operations (used by trait definitions in relaydesk-core).
///
/// Any of these is a storage failure: fatal to the operation in progress.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),
}

/// Failure to hand a message to the chat platform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("rejected by platform: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Errors surfaced by the relay engine.
///
/// Only `Storage` is severe; the others are recovered locally and reported
/// to whoever triggered the operation.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// The message was persisted (as `message_id`) but could not be delivered.
    #[error("message {message_id} stored but not delivered: {source}")]
    Delivery {
        message_id: i64,
        #[source]
        source: DeliveryError,
    },

    #[error("unknown client {0}")]
    UnknownClient(ClientId),

    #[error("malformed command: {0}")]
    MalformedCommand(String),
}

impl RelayError {
    /// Whether the error should be escalated to the process supervisor.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RelayError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_delivery_timeout_display() {
        let err = DeliveryError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "timed out after 10s");
    }

    #[test]
    fn test_only_storage_is_fatal() {
        assert!(RelayError::Storage(RepositoryError::Connection).is_fatal());
        assert!(!RelayError::UnknownClient(ClientId(1)).is_fatal());
        assert!(!RelayError::MalformedCommand("x".into()).is_fatal());
        assert!(
            !RelayError::Delivery {
                message_id: 3,
                source: DeliveryError::Network("reset".into()),
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_delivery_error_mentions_stored_message() {
        let err = RelayError::Delivery {
            message_id: 12,
            source: DeliveryError::Rejected("chat not found".into()),
        };
        let text = err.to_string();
        assert!(text.contains("message 12 stored"));
        assert!(text.contains("chat not found"));
    }
}
