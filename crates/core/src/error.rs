//! Error types for the AutoLearn domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is what the engine
//! and service surface to callers.

use crate::session::{SessionId, Stage};
use thiserror::Error;

/// The top-level error type for all AutoLearn operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A stage raised. The session is still at its last persisted checkpoint
    /// and the same call can be retried.
    #[error("Stage '{stage}' failed for session {session_id}: {source}")]
    StageFailed {
        session_id: SessionId,
        stage: Stage,
        #[source]
        source: StageError,
    },

    #[error("Answer count mismatch: expected {expected} answers, got {actual}")]
    AnswerCountMismatch { expected: usize, actual: usize },

    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Session {0} is already being advanced by another caller")]
    SessionBusy(SessionId),

    #[error("Session {session_id} is not awaiting answers (cursor: {cursor})")]
    NotAwaitingAnswers { session_id: SessionId, cursor: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    /// The session this error concerns, when there is one.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Error::StageFailed { session_id, .. }
            | Error::NotAwaitingAnswers { session_id, .. }
            | Error::SessionNotFound(session_id)
            | Error::SessionBusy(session_id) => Some(session_id),
            _ => None,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Why a single stage attempt failed.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// The question generator broke its contract. Never repaired.
    #[error("Malformed generator output: {0}")]
    MalformedGeneratorOutput(String),

    #[error("Missing stage input: {0}")]
    MissingInput(String),
}

/// A collaborator port call failed or timed out.
#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("{port} request failed: {message}")]
    Request { port: String, message: String },

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Record serialization failed: {0}")]
    Serialization(String),

    /// The stored step is not the one the writer started from: someone else
    /// saved (or deleted) the session in between.
    #[error("Session {session_id} changed underneath the writer (expected step {expected:?}, found {found:?})")]
    Conflict {
        session_id: SessionId,
        expected: Option<u64>,
        found: Option<u64>,
    },
}
