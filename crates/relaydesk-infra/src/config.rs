//! Configuration loader for Relaydesk.
//!
//! Reads `config.toml` from the data directory (`~/.relaydesk/` in production)
//! and deserializes it into [`RelayConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::{Path, PathBuf};

use relaydesk_types::config::RelayConfig;

/// Name of the SQLite database file inside the data directory.
pub const DATABASE_FILE: &str = "relaydesk.db";

/// Resolve the data directory.
///
/// `RELAYDESK_DATA_DIR` wins, then `~/.relaydesk`, then `./.relaydesk`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RELAYDESK_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".relaydesk");
    }

    PathBuf::from(".relaydesk")
}

/// Default database location inside `data_dir`.
pub fn default_database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Load relay configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`RelayConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_relay_config(data_dir: &Path) -> RelayConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return RelayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return RelayConfig::default();
        }
    };

    match toml::from_str::<RelayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            RelayConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_relay_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_relay_config(tmp.path()).await;
        assert_eq!(config, RelayConfig::default());
    }

    #[tokio::test]
    async fn load_relay_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
history_default_count = 10
client_list_limit = 5
greeting = "Welcome!"
"#,
        )
        .await
        .unwrap();

        let config = load_relay_config(tmp.path()).await;
        assert_eq!(config.history_default_count, 10);
        assert_eq!(config.client_list_limit, 5);
        assert_eq!(config.greeting, "Welcome!");
        assert_eq!(config.history_max_count, 100);
    }

    #[tokio::test]
    async fn load_relay_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_relay_config(tmp.path()).await;
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn default_database_path_is_inside_data_dir() {
        let path = default_database_path(Path::new("/var/lib/relaydesk"));
        assert_eq!(path, PathBuf::from("/var/lib/relaydesk/relaydesk.db"));
    }
}
