//! File-based session store: one pretty-printed JSON document per session.
//!
//! Storage location: `~/.autolearn/sessions/<session-id>.json`
//!
//! Every save writes a sibling `.tmp` file and renames it over the target, so
//! a reader sees either the previous checkpoint or the new one. The `.tmp`
//! file is created exclusively and doubles as the write lock for its session:
//! while it exists no other process can save that session. The stored step is
//! compared only once the lock is held.

use async_trait::async_trait;
use autolearn_core::error::StoreError;
use autolearn_core::session::{SessionId, SessionRecord};
use autolearn_core::store::{SessionStore, SessionSummary, check_step, newest_first};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// A lock file older than this was left behind by a crashed writer.
const STALE_LOCK: Duration = Duration::from_secs(30);

/// A directory of JSON session records.
pub struct FileStore {
    dir: PathBuf,
    writes: Mutex<()>,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: PathBuf) -> Result<Self, StoreError> {
        std::fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Storage(format!("Failed to create session directory: {e}"))
        })?;
        debug!(dir = %dir.display(), "File session store ready");
        Ok(Self {
            dir,
            writes: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> Result<PathBuf, StoreError> {
        let raw = id.as_str();
        if raw.is_empty()
            || raw.contains(['/', '\\'])
            || raw.starts_with('.')
        {
            return Err(StoreError::Storage(format!("Invalid session id for file store: {raw:?}")));
        }
        Ok(self.dir.join(format!("{raw}.{EXTENSION}")))
    }

    async fn read_record(path: &Path) -> Result<Option<SessionRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Serialization(format!("{}: {e}", path.display())))
    }

    /// Create the `.tmp` file exclusively. A live one means another writer
    /// holds the session.
    async fn lock_session(
        tmp: &Path,
        path: &Path,
        id: &SessionId,
        expected: Option<u64>,
    ) -> Result<tokio::fs::File, StoreError> {
        let mut reclaimed = false;
        loop {
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(tmp)
                .await;
            match opened {
                Ok(file) => return Ok(file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if !reclaimed && Self::is_stale(tmp).await {
                        warn!(path = %tmp.display(), "Removing stale session lock");
                        let _ = tokio::fs::remove_file(tmp).await;
                        reclaimed = true;
                        continue;
                    }
                    let found = Self::read_record(path).await.ok().flatten().map(|r| r.step);
                    return Err(StoreError::Conflict {
                        session_id: id.clone(),
                        expected,
                        found,
                    });
                }
                Err(e) => {
                    return Err(StoreError::Storage(format!(
                        "Failed to create {}: {e}",
                        tmp.display()
                    )));
                }
            }
        }
    }

    async fn is_stale(tmp: &Path) -> bool {
        match tokio::fs::metadata(tmp).await.and_then(|m| m.modified()) {
            Ok(modified) => modified.elapsed().unwrap_or_default() > STALE_LOCK,
            Err(_) => false,
        }
    }

    /// With the lock held: compare steps, then write and rename into place.
    async fn write_if_current(
        mut file: tokio::fs::File,
        tmp: &Path,
        path: &Path,
        record: &SessionRecord,
        expected: Option<u64>,
        content: &str,
    ) -> Result<(), StoreError> {
        let stored = Self::read_record(path).await?.map(|r| r.step);
        check_step(record.session_id(), stored, expected)?;

        let write_err = |e: std::io::Error| StoreError::Storage(format!("Failed to write session file: {e}"));
        file.write_all(content.as_bytes()).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;
        drop(file);

        tokio::fs::rename(tmp, path)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to replace session file: {e}")))
    }

    async fn record_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to list sessions: {e}")))?;

        let mut paths = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to list sessions: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

#[async_trait]
impl SessionStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(
        &self,
        record: &SessionRecord,
        expected_step: Option<u64>,
    ) -> Result<(), StoreError> {
        let id = record.session_id();
        let path = self.path_for(id)?;
        let tmp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize session: {e}")))?;

        let _writes = self.writes.lock().await;
        let file = Self::lock_session(&tmp, &path, id, expected_step).await?;
        if let Err(e) =
            Self::write_if_current(file, &tmp, &path, record, expected_step, &content).await
        {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        debug!(session_id = %record.session_id(), step = record.step, "Session saved to file");
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let path = self.path_for(id)?;
        Self::read_record(&path).await
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let mut summaries = Vec::new();
        for path in self.record_paths().await? {
            match Self::read_record(&path).await {
                Ok(Some(record)) => summaries.push(SessionSummary::from_record(&record)),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping corrupted session file"),
            }
        }
        newest_first(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Storage(format!("Failed to delete session: {e}"))),
        }
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.record_paths().await?.len())
    }
}
