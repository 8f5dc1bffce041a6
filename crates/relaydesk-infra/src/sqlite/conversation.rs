//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `relaydesk-core` using sqlx with split
//! read/write pools. Both write operations run in a transaction on the
//! single-connection writer pool; reads use the reader pool and see a
//! consistent WAL snapshot per statement.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use relaydesk_core::repository::conversation::ConversationRepository;
use relaydesk_types::client::{Client, ClientId};
use relaydesk_types::error::RepositoryError;
use relaydesk_types::message::{Direction, Message};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ClientRow {
    id: i64,
    display_name: String,
    last_contact_at: Option<String>,
}

impl ClientRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            display_name: row.try_get("display_name")?,
            last_contact_at: row.try_get("last_contact_at")?,
        })
    }

    fn into_client(self) -> Result<Client, RepositoryError> {
        Ok(Client {
            id: ClientId(self.id),
            display_name: self.display_name,
            last_contact_at: self.last_contact_at.as_deref().map(parse_datetime).transpose()?,
        })
    }
}

struct MessageRow {
    id: i64,
    client_id: i64,
    direction: String,
    text: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            direction: row.try_get("direction")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let direction: Direction = self
            .direction
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Message {
            id: self.id,
            client_id: ClientId(self.client_id),
            direction,
            text: self.text,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC form, so lexical order in SQL equals time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => RepositoryError::Connection,
        other => RepositoryError::Query(other.to_string()),
    }
}

fn rows_to_messages(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<Message>, RepositoryError> {
    let mut messages = Vec::with_capacity(rows.len());
    for row in rows {
        let msg_row = MessageRow::from_row(row).map_err(db_err)?;
        messages.push(msg_row.into_message()?);
    }
    Ok(messages)
}

// ---------------------------------------------------------------------------
// ConversationRepository implementation
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn ensure_client(
        &self,
        id: ClientId,
        display_name: Option<&str>,
    ) -> Result<Client, RepositoryError> {
        let display_name = display_name.map(str::trim).filter(|n| !n.is_empty());

        let mut tx = self.pool.writer.begin().await.map_err(db_err)?;

        sqlx::query("INSERT INTO clients (id, display_name) VALUES (?, ?) ON CONFLICT (id) DO NOTHING")
            .bind(id.get())
            .bind(display_name.map_or_else(|| Client::fallback_name(id), str::to_string))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        // Always refresh to the latest known name.
        if let Some(name) = display_name {
            sqlx::query("UPDATE clients SET display_name = ? WHERE id = ? AND display_name != ?")
                .bind(name)
                .bind(id.get())
                .bind(name)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        let row = sqlx::query("SELECT id, display_name, last_contact_at FROM clients WHERE id = ?")
            .bind(id.get())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        ClientRow::from_row(&row).map_err(db_err)?.into_client()
    }

    async fn record_message(
        &self,
        client_id: ClientId,
        direction: Direction,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, RepositoryError> {
        // Use a transaction: INSERT message + UPDATE clients.last_contact_at
        let mut tx = self.pool.writer.begin().await.map_err(db_err)?;

        sqlx::query("INSERT INTO clients (id, display_name) VALUES (?, ?) ON CONFLICT (id) DO NOTHING")
            .bind(client_id.get())
            .bind(Client::fallback_name(client_id))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let last: Option<String> =
            sqlx::query_scalar("SELECT last_contact_at FROM clients WHERE id = ?")
                .bind(client_id.get())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;
        let last = last.as_deref().map(parse_datetime).transpose()?;

        // Never move backwards: a stale `at` lands at the client's latest
        // timestamp so that (created_at, id) order equals insertion order.
        let at = at.trunc_subsecs(6);
        let created_at = last.map_or(at, |last| last.max(at));

        let result = sqlx::query(
            "INSERT INTO messages (client_id, direction, text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(client_id.get())
        .bind(direction.to_string())
        .bind(text)
        .bind(format_datetime(&created_at))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let id = result.last_insert_rowid();

        sqlx::query("UPDATE clients SET last_contact_at = ? WHERE id = ?")
            .bind(format_datetime(&created_at))
            .bind(client_id.get())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(Message {
            id,
            client_id,
            direction,
            text: text.to_string(),
            created_at,
        })
    }

    async fn list_clients(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, display_name, last_contact_at FROM clients
             ORDER BY last_contact_at IS NULL, last_contact_at DESC, id ASC",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(db_err)?;

        let mut clients = Vec::with_capacity(rows.len());
        for row in &rows {
            clients.push(ClientRow::from_row(row).map_err(db_err)?.into_client()?);
        }
        Ok(clients)
    }

    async fn get_history(
        &self,
        client_id: ClientId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = match limit {
            Some(limit) if limit > 0 => {
                sqlx::query(
                    "SELECT * FROM (
                         SELECT * FROM messages WHERE client_id = ?
                         ORDER BY created_at DESC, id DESC LIMIT ?
                     ) ORDER BY created_at ASC, id ASC",
                )
                .bind(client_id.get())
                .bind(limit)
                .fetch_all(&self.pool.reader)
                .await
            }
            _ => {
                sqlx::query(
                    "SELECT * FROM messages WHERE client_id = ? ORDER BY created_at ASC, id ASC",
                )
                .bind(client_id.get())
                .fetch_all(&self.pool.reader)
                .await
            }
        }
        .map_err(db_err)?;

        rows_to_messages(&rows)
    }

    async fn client_exists(&self, id: ClientId) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM clients WHERE id = ?)")
            .bind(id.get())
            .fetch_one(&self.pool.reader)
            .await
            .map_err(db_err)?;
        Ok(exists != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    async fn test_repo() -> SqliteConversationRepository {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        SqliteConversationRepository::new(DatabasePool::open(&db_path).await.unwrap())
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_client_creates_and_is_idempotent() {
        let repo = test_repo().await;

        let created = repo.ensure_client(ClientId(42), Some("Alice")).await.unwrap();
        assert_eq!(created.display_name, "Alice");
        assert_eq!(created.last_contact_at, None);

        let again = repo.ensure_client(ClientId(42), Some("Alice")).await.unwrap();
        assert_eq!(again, created);
        assert_eq!(repo.list_clients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_client_refreshes_display_name() {
        let repo = test_repo().await;
        repo.ensure_client(ClientId(42), Some("Alice")).await.unwrap();

        let renamed = repo.ensure_client(ClientId(42), Some("@alice_s")).await.unwrap();
        assert_eq!(renamed.display_name, "@alice_s");

        // No hint (or a blank one) keeps the known name.
        let kept = repo.ensure_client(ClientId(42), None).await.unwrap();
        assert_eq!(kept.display_name, "@alice_s");
        let kept = repo.ensure_client(ClientId(42), Some("   ")).await.unwrap();
        assert_eq!(kept.display_name, "@alice_s");
    }

    #[tokio::test]
    async fn test_ensure_client_without_name_uses_fallback() {
        let repo = test_repo().await;
        let client = repo.ensure_client(ClientId(5), None).await.unwrap();
        assert_eq!(client.display_name, "ID: 5");
    }

    #[tokio::test]
    async fn test_record_message_creates_missing_client() {
        let repo = test_repo().await;
        let msg = repo
            .record_message(ClientId(8), Direction::Inbound, "hi", t(1))
            .await
            .unwrap();
        assert_eq!(msg.created_at, t(1));
        assert!(repo.client_exists(ClientId(8)).await.unwrap());

        let clients = repo.list_clients().await.unwrap();
        assert_eq!(clients[0].last_contact_at, Some(t(1)));
    }

    #[tokio::test]
    async fn test_history_matches_call_order() {
        let repo = test_repo().await;
        let id = ClientId(42);
        let mut expected = Vec::new();
        for i in 0..6 {
            let direction = if i % 2 == 0 {
                Direction::Inbound
            } else {
                Direction::Outbound
            };
            // Two messages per second to exercise the id tie-break.
            let msg = repo
                .record_message(id, direction, &format!("m{i}"), t(i / 2))
                .await
                .unwrap();
            expected.push(msg);
        }

        let history = repo.get_history(id, None).await.unwrap();
        assert_eq!(history, expected);
        for pair in history.windows(2) {
            assert!(pair[0].id < pair[1].id);
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_history_limit_returns_latest_in_chronological_order() {
        let repo = test_repo().await;
        let id = ClientId(42);
        for i in 0..5 {
            repo.record_message(id, Direction::Inbound, &format!("m{i}"), t(i))
                .await
                .unwrap();
        }

        let texts = |msgs: Vec<Message>| msgs.into_iter().map(|m| m.text).collect::<Vec<_>>();

        assert_eq!(texts(repo.get_history(id, Some(2)).await.unwrap()), vec!["m3", "m4"]);
        assert_eq!(texts(repo.get_history(id, Some(1)).await.unwrap()), vec!["m4"]);
        assert_eq!(repo.get_history(id, Some(50)).await.unwrap().len(), 5);
        assert_eq!(repo.get_history(id, Some(0)).await.unwrap().len(), 5);
        assert_eq!(repo.get_history(id, Some(-1)).await.unwrap().len(), 5);
        assert_eq!(repo.get_history(id, None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_history_is_per_client() {
        let repo = test_repo().await;
        repo.record_message(ClientId(1), Direction::Inbound, "a", t(1))
            .await
            .unwrap();
        repo.record_message(ClientId(2), Direction::Inbound, "b", t(2))
            .await
            .unwrap();

        let history = repo.get_history(ClientId(1), None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "a");
        assert!(repo.get_history(ClientId(999), None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_last_contact_only_moves_forward() {
        let repo = test_repo().await;
        let id = ClientId(42);
        repo.record_message(id, Direction::Inbound, "new", t(10))
            .await
            .unwrap();

        let stale = repo
            .record_message(id, Direction::Outbound, "stale", t(5))
            .await
            .unwrap();
        assert_eq!(stale.created_at, t(10));

        let clients = repo.list_clients().await.unwrap();
        assert_eq!(clients[0].last_contact_at, Some(t(10)));

        let history = repo.get_history(id, None).await.unwrap();
        assert_eq!(history.last().unwrap().text, "stale");
    }

    #[tokio::test]
    async fn test_list_clients_order() {
        let repo = test_repo().await;
        repo.ensure_client(ClientId(100), Some("silent")).await.unwrap();
        repo.record_message(ClientId(7), Direction::Inbound, "x", t(1))
            .await
            .unwrap();
        repo.record_message(ClientId(42), Direction::Inbound, "y", t(2))
            .await
            .unwrap();
        repo.record_message(ClientId(3), Direction::Inbound, "z", t(1))
            .await
            .unwrap();

        let ids: Vec<i64> = repo
            .list_clients()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.get())
            .collect();
        // Newest first, ties by id ascending, never-contacted last.
        assert_eq!(ids, vec![42, 3, 7, 100]);
    }

    #[tokio::test]
    async fn test_client_exists() {
        let repo = test_repo().await;
        assert!(!repo.client_exists(ClientId(1)).await.unwrap());
        repo.ensure_client(ClientId(1), None).await.unwrap();
        assert!(repo.client_exists(ClientId(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_ids_unique_and_ordered() {
        let repo = Arc::new(test_repo().await);
        let mut handles = Vec::new();
        for i in 0..40i64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.record_message(ClientId(i % 4), Direction::Inbound, &format!("m{i}"), t(i))
                    .await
                    .unwrap()
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().id);
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 40);

        for client in 0..4 {
            let history = repo.get_history(ClientId(client), None).await.unwrap();
            assert_eq!(history.len(), 10);
            for pair in history.windows(2) {
                assert!(pair[0].id < pair[1].id);
                assert!(pair[0].created_at <= pair[1].created_at);
            }
        }
    }

    #[test]
    fn test_format_datetime_is_fixed_width() {
        let a = format_datetime(&t(0));
        let b = format_datetime(&(t(0) + chrono::Duration::microseconds(5)));
        assert_eq!(a.len(), b.len());
        assert!(a < b);
        assert!(a.ends_with('Z'));
    }
}
