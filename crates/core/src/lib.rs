//! # AutoLearn Core
//!
//! Domain types, traits, and error definitions for the AutoLearn adaptive
//! learning engine. This crate has **zero framework dependencies**: it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator and the checkpoint store are traits here.
//! Implementations live in their respective crates, so the workflow engine
//! runs the same against LLM adapters, offline stubs, or test mocks.

pub mod error;
pub mod event;
pub mod ports;
pub mod session;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{CollaboratorError, Error, Result, StageError, StoreError};
pub use event::{EventBus, SessionEvent};
pub use ports::{
    Collaborators, ContextSource, ExplanationGenerator, QuestionGenerator, Relevance,
    RelevanceJudge, Summarizer,
};
pub use session::{
    Attempt, Checkpoint, Cursor, Explanation, Outcome, Percent, Question, SessionId,
    SessionRecord, SessionState, SessionStatus, Stage, StageOutput,
};
pub use store::{SessionStore, SessionSummary};
