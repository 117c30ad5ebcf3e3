//! Workflow engine: stages, branching, and checkpointed resume.
//!
//! A learning session moves through a fixed graph of stages. Context is
//! gathered and judged (retrying up to a ceiling), summarized, and turned into
//! a batch of questions. The engine then suspends until answers arrive; a
//! failed assessment routes through remediation back to a fresh batch.
//!
//! Every completed stage is checkpointed to a [`SessionStore`], so a session
//! interrupted at any point resumes from its last completed stage.
//!
//! [`SessionStore`]: autolearn_core::store::SessionStore

pub mod chunk;
pub mod engine;
pub mod graph;
pub mod policy;
pub mod service;
pub mod stages;

#[cfg(test)]
mod test_helpers;

pub use chunk::TextChunker;
pub use engine::Engine;
pub use graph::{AssessmentDecision, ContextDecision, decide_assessment, decide_context, next_cursor};
pub use policy::WorkflowPolicy;
pub use service::{
    AssessmentReport, Correction, LearningService, NewSession, QuestionView, SessionView,
};
