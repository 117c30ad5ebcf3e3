//! SQLite session store.
//!
//! One row per session. The full [`SessionRecord`] lives in the `record`
//! column as JSON; `topic`, `status`, `step` and the timestamps are copied
//! into their own columns so history queries never have to parse JSON.

use async_trait::async_trait;
use autolearn_core::error::StoreError;
use autolearn_core::session::{SessionId, SessionRecord};
use autolearn_core::store::{SessionStore, SessionSummary, newest_first};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// A SQLite-backed session store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url`, e.g. `sqlite:///home/me/.autolearn/sessions.sqlite`.
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite session store initialized at {url}");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id          TEXT PRIMARY KEY NOT NULL,
                topic       TEXT NOT NULL,
                status      TEXT NOT NULL,
                step        INTEGER NOT NULL,
                record      TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("sessions table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions(created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("created_at index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    async fn stored_step(&self, id: &SessionId) -> Result<Option<u64>, StoreError> {
        let row = sqlx::query("SELECT step FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to read session step: {e}")))?;
        Ok(row.map(|row| row.get::<i64, _>("step") as u64))
    }

    fn decode(raw: &str) -> Result<SessionRecord, StoreError> {
        serde_json::from_str(raw)
            .map_err(|e| StoreError::Serialization(format!("Corrupted session record: {e}")))
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn save(
        &self,
        record: &SessionRecord,
        expected_step: Option<u64>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize session: {e}")))?;
        let state = &record.state;

        // Insert only when new; otherwise update only the row still at the
        // step the writer read. A row that was deleted stays deleted.
        let result = match expected_step {
            None => sqlx::query(
                r#"
                INSERT INTO sessions (id, topic, status, step, record, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO NOTHING
                "#,
            )
            .bind(state.session_id.as_str())
            .bind(&state.checkpoint.topic)
            .bind(record.status().as_str())
            .bind(record.step as i64)
            .bind(&json)
            .bind(state.created_at.to_rfc3339())
            .bind(state.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await,
            Some(expected) => sqlx::query(
                r#"
                UPDATE sessions SET
                    topic = ?,
                    status = ?,
                    step = ?,
                    record = ?,
                    updated_at = ?
                WHERE id = ? AND step = ?
                "#,
            )
            .bind(&state.checkpoint.topic)
            .bind(record.status().as_str())
            .bind(record.step as i64)
            .bind(&json)
            .bind(state.updated_at.to_rfc3339())
            .bind(state.session_id.as_str())
            .bind(expected as i64)
            .execute(&self.pool)
            .await,
        }
        .map_err(|e| StoreError::QueryFailed(format!("Failed to save session: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                session_id: state.session_id.clone(),
                expected: expected_step,
                found: self.stored_step(&state.session_id).await?,
            });
        }

        debug!(session_id = %state.session_id, step = record.step, "Session saved to SQLite");
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query("SELECT record FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to load session: {e}")))?;

        match row {
            Some(row) => {
                let raw: String = row.get("record");
                Ok(Some(Self::decode(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let rows = sqlx::query("SELECT id, record FROM sessions ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to list sessions: {e}")))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let raw: String = row.get("record");
            match Self::decode(&raw) {
                Ok(record) => summaries.push(SessionSummary::from_record(&record)),
                Err(e) => warn!(session_id = %id, error = %e, "Skipping corrupted session row"),
            }
        }
        newest_first(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to delete session: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM sessions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Failed to count sessions: {e}")))?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_records::record;
    use autolearn_core::session::{Cursor, SessionStatus};

    async fn store_in(dir: &tempfile::TempDir) -> SqliteStore {
        let url = format!("sqlite://{}", dir.path().join("sessions.sqlite").display());
        SqliteStore::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let rec = record("s1", "Smart pointers");
        store.save(&rec, None).await.unwrap();

        let loaded = store.load(&SessionId::from("s1")).await.unwrap().unwrap();
        assert_eq!(loaded, rec);
        assert!(store.load(&SessionId::from("missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_record_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let mut rec = record("s1", "Smart pointers");
        store.save(&rec, None).await.unwrap();
        rec.cursor = Cursor::AwaitingAnswers;
        rec.step = 6;
        store.save(&rec, Some(1)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let list = store.list().await.unwrap();
        assert_eq!(list[0].status, SessionStatus::AwaitingAnswers);
        assert_eq!(list[0].step, 6);
    }

    #[tokio::test]
    async fn list_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        let mut old = record("old", "Generics");
        old.state.created_at = chrono::Utc::now() - chrono::Duration::days(1);
        store.save(&old, None).await.unwrap();
        store.save(&record("new", "Macros"), None).await.unwrap();

        let list = store.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id.as_str(), "new");
        assert_eq!(list[1].id.as_str(), "old");
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        store_in(&dir)
            .await
            .save(&record("keep", "Traits"), None)
            .await
            .unwrap();

        let reopened = store_in(&dir).await;
        assert!(reopened.load(&SessionId::from("keep")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store.save(&record("gone", "Async"), None).await.unwrap();

        assert!(store.delete(&SessionId::from("gone")).await.unwrap());
        assert!(!store.delete(&SessionId::from("gone")).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn two_pools_cannot_both_advance_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let a = store_in(&dir).await;
        let b = store_in(&dir).await;

        let rec = record("race", "Lifetimes");
        a.save(&rec, None).await.unwrap();
        assert!(matches!(
            b.save(&rec, None).await,
            Err(StoreError::Conflict { found: Some(1), .. })
        ));

        let mut from_a = rec.clone();
        from_a.step = 2;
        from_a.cursor = Cursor::Next(autolearn_core::session::Stage::Validate);
        let mut from_b = rec.clone();
        from_b.step = 2;
        from_b.cursor = Cursor::AwaitingAnswers;

        a.save(&from_a, Some(1)).await.unwrap();
        let err = b.save(&from_b, Some(1)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: Some(1),
                found: Some(2),
                ..
            }
        ));
        let stored = b.load(&SessionId::from("race")).await.unwrap().unwrap();
        assert_eq!(stored, from_a);
    }

    #[tokio::test]
    async fn update_after_delete_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        let mut rec = record("gone", "Async");
        store.save(&rec, None).await.unwrap();
        store.delete(&SessionId::from("gone")).await.unwrap();

        rec.step = 2;
        assert!(matches!(
            store.save(&rec, Some(1)).await,
            Err(StoreError::Conflict { found: None, .. })
        ));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
