//! Relay configuration types for Relaydesk.
//!
//! `RelayConfig` represents the optional `config.toml` in the data directory
//! that tunes the relay. Credentials and the administrator chat id are not
//! part of this file; they come from the command line or environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tuning knobs for the relay. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Number of messages `/history` shows when no count is given.
    #[serde(default = "default_history_count")]
    pub history_default_count: u32,

    /// Upper bound for an explicit `/history` count.
    #[serde(default = "default_history_max")]
    pub history_max_count: u32,

    /// Upper bound on a single delivery attempt to the chat platform.
    #[serde(default = "default_delivery_timeout")]
    pub delivery_timeout_secs: u64,

    /// Long-poll timeout passed to the chat platform.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Maximum number of clients rendered by `/clients`.
    #[serde(default = "default_client_list_limit")]
    pub client_list_limit: usize,

    /// Reply sent to a client that opens the conversation with `/start`.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_history_count() -> u32 {
    20
}

fn default_history_max() -> u32 {
    100
}

fn default_delivery_timeout() -> u64 {
    10
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_client_list_limit() -> usize {
    50
}

fn default_greeting() -> String {
    "Hello! Write your question here and it will be passed to an operator. \
     You will get an answer soon."
        .to_string()
}

impl RelayConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs.max(1))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            history_default_count: default_history_count(),
            history_max_count: default_history_max(),
            delivery_timeout_secs: default_delivery_timeout(),
            poll_timeout_secs: default_poll_timeout(),
            client_list_limit: default_client_list_limit(),
            greeting: default_greeting(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_default_values() {
        let config = RelayConfig::default();
        assert_eq!(config.history_default_count, 20);
        assert_eq!(config.history_max_count, 100);
        assert_eq!(config.delivery_timeout(), Duration::from_secs(10));
        assert_eq!(config.client_list_limit, 50);
    }

    #[test]
    fn test_relay_config_deserialize_with_defaults() {
        let config: RelayConfig = toml::from_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_relay_config_deserialize_with_values() {
        let toml_str = r#"
history_default_count = 5
delivery_timeout_secs = 3
greeting = "hi"
"#;
        let config: RelayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.history_default_count, 5);
        assert_eq!(config.history_max_count, 100);
        assert_eq!(config.delivery_timeout(), Duration::from_secs(3));
        assert_eq!(config.greeting, "hi");
    }

    #[test]
    fn test_zero_delivery_timeout_is_floored() {
        let config = RelayConfig {
            delivery_timeout_secs: 0,
            ..RelayConfig::default()
        };
        assert_eq!(config.delivery_timeout(), Duration::from_secs(1));
    }
}
