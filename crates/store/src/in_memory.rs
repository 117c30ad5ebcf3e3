//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use autolearn_core::error::StoreError;
use autolearn_core::session::{SessionId, SessionRecord};
use autolearn_core::store::{SessionStore, SessionSummary, check_step, newest_first};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory store that keeps records in a map.
/// Useful for testing and sessions where persistence isn't needed.
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<SessionId, SessionRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn save(
        &self,
        record: &SessionRecord,
        expected_step: Option<u64>,
    ) -> Result<(), StoreError> {
        let id = record.session_id();
        let mut records = self.records.write().await;
        check_step(id, records.get(id).map(|r| r.step), expected_step)?;
        records.insert(id.clone(), record.clone());
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let records = self.records.read().await;
        let mut summaries: Vec<SessionSummary> =
            records.values().map(SessionSummary::from_record).collect();
        newest_first(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(id).is_some())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}
