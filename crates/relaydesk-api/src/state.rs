//! Application state wiring the store, configuration, and relay engine.
//!
//! Services are generic over repository/transport traits; AppState pins
//! them to the concrete infra implementations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use relaydesk_core::relay::RelayEngine;
use relaydesk_infra::config::{default_database_path, load_relay_config, resolve_data_dir};
use relaydesk_infra::sqlite::conversation::SqliteConversationRepository;
use relaydesk_infra::sqlite::pool::DatabasePool;
use relaydesk_infra::telegram::TelegramClient;
use relaydesk_types::config::RelayConfig;

pub type ConcreteRelayEngine = RelayEngine<SqliteConversationRepository, TelegramClient>;

/// Shared application state used by every subcommand.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub config: RelayConfig,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Resolve the data directory, load `config.toml`, and open the database.
    ///
    /// `database` overrides the default `<data dir>/relaydesk.db`.
    pub async fn init(database: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let config = load_relay_config(&data_dir).await;

        let database_path = database
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_database_path(&data_dir));
        if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db_pool = DatabasePool::open(&database_path)
            .await
            .with_context(|| format!("opening database {}", database_path.display()))?;

        tracing::debug!(
            data_dir = %data_dir.display(),
            database = %database_path.display(),
            "application state initialized"
        );

        Ok(Self {
            data_dir,
            database_path,
            config,
            db_pool,
        })
    }

    pub fn repository(&self) -> SqliteConversationRepository {
        SqliteConversationRepository::new(self.db_pool.clone())
    }

    /// Build the relay engine bound to one administrator chat.
    pub fn relay_engine(&self, telegram: TelegramClient, admin_chat_id: i64) -> ConcreteRelayEngine {
        RelayEngine::new(self.repository(), telegram, admin_chat_id, &self.config)
    }
}
