//! Session store trait: durable checkpoints keyed by session id.
//!
//! The engine writes a whole [`SessionRecord`] after every completed stage.
//! Implementations must make each `save` atomic: a concurrent `load` sees
//! either the previous record or the new one, never a mix.
//!
//! Saves are compare-and-swap on [`SessionRecord::step`]. The writer names
//! the step it read (`None` for a brand new session) and the store refuses
//! with [`StoreError::Conflict`] when the stored step differs. Two engines,
//! or two processes, sharing one store can therefore never both advance the
//! same session from the same checkpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::session::{Percent, SessionId, SessionRecord, SessionStatus};

/// A history row: what a caller needs to list past sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub topic: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Percent>,
    pub relevance_score: Percent,
    pub attempts: usize,
    pub step: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn from_record(record: &SessionRecord) -> Self {
        let state = &record.state;
        Self {
            id: state.session_id.clone(),
            topic: state.checkpoint.topic.clone(),
            status: record.status(),
            score: state.score,
            relevance_score: state.relevance_score,
            attempts: state.attempts.len(),
            step: record.step,
            created_at: state.created_at,
            updated_at: state.updated_at,
        }
    }
}

/// Sort summaries newest first (by creation time).
pub fn newest_first(summaries: &mut [SessionSummary]) {
    summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// The compare half of a compare-and-swap save.
///
/// `stored` is the step currently persisted for `id` (`None` when absent).
pub fn check_step(
    id: &SessionId,
    stored: Option<u64>,
    expected: Option<u64>,
) -> Result<(), StoreError> {
    if stored == expected {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            session_id: id.clone(),
            expected,
            found: stored,
        })
    }
}

/// The core SessionStore trait.
///
/// Implementations: SQLite, JSON files, in-memory (for testing).
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "file", "in_memory").
    fn name(&self) -> &str;

    /// Persist `record` if the stored step still equals `expected_step`.
    ///
    /// `None` inserts a new session and fails if the id already exists.
    async fn save(
        &self,
        record: &SessionRecord,
        expected_step: Option<u64>,
    ) -> Result<(), StoreError>;

    /// Load the last persisted record.
    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError>;

    /// All sessions, newest first.
    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError>;

    /// Remove a session. Returns whether it existed.
    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError>;

    /// Number of stored sessions.
    async fn count(&self) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Checkpoint, Cursor, SessionState};

    #[test]
    fn summary_from_record() {
        let state = SessionState::new(
            SessionId::from("s-42"),
            Checkpoint::new("Lifetimes", vec![], vec![]),
        );
        let mut record = SessionRecord::fresh(state);
        record.cursor = Cursor::AwaitingAnswers;
        record.step = 7;

        let summary = SessionSummary::from_record(&record);
        assert_eq!(summary.id.as_str(), "s-42");
        assert_eq!(summary.topic, "Lifetimes");
        assert_eq!(summary.status, SessionStatus::AwaitingAnswers);
        assert_eq!(summary.step, 7);
        assert!(summary.score.is_none());
    }

    #[test]
    fn check_step_compares_exactly() {
        let id = SessionId::from("s");
        assert!(check_step(&id, None, None).is_ok());
        assert!(check_step(&id, Some(3), Some(3)).is_ok());
        assert!(matches!(
            check_step(&id, Some(4), Some(3)),
            Err(StoreError::Conflict {
                expected: Some(3),
                found: Some(4),
                ..
            })
        ));
        assert!(check_step(&id, Some(0), None).is_err());
        assert!(check_step(&id, None, Some(2)).is_err());
    }

    #[test]
    fn newest_first_orders_by_creation() {
        let mut older = SessionSummary::from_record(&SessionRecord::fresh(SessionState::new(
            SessionId::from("old"),
            Checkpoint::new("A", vec![], vec![]),
        )));
        older.created_at = Utc::now() - chrono::Duration::hours(1);
        let newer = SessionSummary::from_record(&SessionRecord::fresh(SessionState::new(
            SessionId::from("new"),
            Checkpoint::new("B", vec![], vec![]),
        )));

        let mut list = vec![older, newer];
        newest_first(&mut list);
        assert_eq!(list[0].id.as_str(), "new");
    }
}
