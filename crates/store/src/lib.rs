//! Session store implementations for AutoLearn.

pub mod file_backend;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use autolearn_core::error::StoreError;
use autolearn_core::store::SessionStore;
use std::path::Path;
use std::sync::Arc;

/// Open the store named by `backend` ("sqlite", "file", or "memory").
///
/// `path` is the database file for sqlite and the directory for file; it is
/// ignored for memory.
pub async fn open(backend: &str, path: &Path) -> Result<Arc<dyn SessionStore>, StoreError> {
    match backend {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "file" => Ok(Arc::new(FileStore::new(path.to_path_buf())?)),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            let url = format!("sqlite://{}", path.display());
            Ok(Arc::new(SqliteStore::new(&url).await?))
        }
        other => Err(StoreError::Storage(format!("Unknown store backend: {other}"))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_memory_and_file_backends() {
        let dir = tempfile::tempdir().unwrap();

        let memory = open("memory", dir.path()).await.unwrap();
        assert_eq!(memory.name(), "in_memory");

        let file = open("file", &dir.path().join("sessions")).await.unwrap();
        assert_eq!(file.name(), "file");
    }

    #[tokio::test]
    async fn open_unknown_backend_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open("redis", dir.path()).await.is_err());
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn open_sqlite_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.sqlite");
        let store = open("sqlite", &path).await.unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(path.exists());
    }
}
