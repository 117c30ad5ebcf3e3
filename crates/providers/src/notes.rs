//! The learner's notes directory.
//!
//! Plain `*.md` and `*.txt` files. A note matches a topic when its file name
//! or its content mentions the topic (case-insensitive). Matching notes are
//! concatenated in file-name order.

use autolearn_core::error::CollaboratorError;
use std::path::PathBuf;
use tracing::debug;

use crate::web_search::truncate_chars;

pub struct NotesDirectory {
    dir: Option<PathBuf>,
    max_chars: usize,
}

impl NotesDirectory {
    /// `dir = None` means the learner has no notes; every lookup returns "".
    pub fn new(dir: Option<PathBuf>, max_chars: usize) -> Self {
        Self { dir, max_chars }
    }

    /// Notes mentioning `topic`, or "" when none match.
    pub async fn find(&self, topic: &str) -> Result<String, CollaboratorError> {
        let Some(dir) = &self.dir else {
            return Ok(String::new());
        };
        let needle = topic.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(String::new());
        }

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Notes directory does not exist");
                return Ok(String::new());
            }
            Err(e) => {
                return Err(CollaboratorError::Request {
                    port: "notes".into(),
                    message: format!("Failed to read {}: {e}", dir.display()),
                });
            }
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| CollaboratorError::Request {
            port: "notes".into(),
            message: e.to_string(),
        })? {
            let path = entry.path();
            let is_note = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("txt"));
            if is_note {
                paths.push(path);
            }
        }
        paths.sort();

        let mut sections = Vec::new();
        for path in paths {
            let Ok(content) = tokio::fs::read_to_string(&path).await else {
                continue;
            };
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if file_name.to_lowercase().contains(&needle)
                || content.to_lowercase().contains(&needle)
            {
                sections.push(format!("## {file_name}\n{}", content.trim()));
            }
        }

        debug!(topic, matched = sections.len(), "Notes lookup");
        Ok(truncate_chars(&sections.join("\n\n"), self.max_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_directory_means_no_notes() {
        let notes = NotesDirectory::new(None, 1000);
        assert_eq!(notes.find("Rust").await.unwrap(), "");

        let missing = NotesDirectory::new(Some(PathBuf::from("/definitely/not/here")), 1000);
        assert_eq!(missing.find("Rust").await.unwrap(), "");
    }

    #[tokio::test]
    async fn matches_by_name_or_content() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("closures.md"), "Closures capture their environment.").unwrap();
        std::fs::write(dir.path().join("misc.txt"), "A note about CLOSURES and Fn traits.").unwrap();
        std::fs::write(dir.path().join("other.md"), "Nothing relevant.").unwrap();
        std::fs::write(dir.path().join("closures.rs"), "fn main() {}").unwrap();

        let notes = NotesDirectory::new(Some(dir.path().to_path_buf()), 10_000);
        let found = notes.find("closures").await.unwrap();

        assert!(found.starts_with("## closures.md\n"));
        assert!(found.contains("## misc.txt"));
        assert!(!found.contains("Nothing relevant"));
        assert!(!found.contains("fn main"));
    }

    #[tokio::test]
    async fn unmatched_topic_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("traits.md"), "Traits define shared behavior.").unwrap();

        let notes = NotesDirectory::new(Some(dir.path().to_path_buf()), 10_000);
        assert_eq!(notes.find("Lifetimes").await.unwrap(), "");
    }
}
