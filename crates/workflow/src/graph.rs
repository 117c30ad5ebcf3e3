//! The stage graph: edges, branch predicates, and the suspension point.
//!
//! ```text
//! start -> gather -> validate
//! validate --(relevant)--> process
//! validate --(not relevant, iterations < max)--> gather
//! validate --(not relevant, iterations >= max)--> END (InsufficientContext)
//! process -> summarize -> questions -> [await answers] -> verify
//! verify --(score >= threshold)--> END (Mastered)
//! verify --(score < threshold)--> remedial
//! remedial -> questions
//! ```

use autolearn_core::session::{Cursor, Outcome, SessionState, Stage};

use crate::policy::WorkflowPolicy;

/// Where the context-retry cycle goes after `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextDecision {
    Process,
    Retry,
    End,
}

/// Where the assessment cycle goes after `verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentDecision {
    Complete,
    Remedial,
}

pub fn decide_context(state: &SessionState, policy: &WorkflowPolicy) -> ContextDecision {
    if state.is_relevant {
        ContextDecision::Process
    } else if state.iterations < policy.max_context_attempts {
        ContextDecision::Retry
    } else {
        ContextDecision::End
    }
}

pub fn decide_assessment(state: &SessionState, policy: &WorkflowPolicy) -> AssessmentDecision {
    let score = state.score.map(|s| s.value()).unwrap_or(0.0);
    if score >= policy.mastery_threshold {
        AssessmentDecision::Complete
    } else {
        AssessmentDecision::Remedial
    }
}

/// The cursor after `completed` has been merged into `state`.
pub fn next_cursor(completed: Stage, state: &SessionState, policy: &WorkflowPolicy) -> Cursor {
    match completed {
        Stage::Start => Cursor::Next(Stage::Gather),
        Stage::Gather => Cursor::Next(Stage::Validate),
        Stage::Validate => match decide_context(state, policy) {
            ContextDecision::Process => Cursor::Next(Stage::Process),
            ContextDecision::Retry => Cursor::Next(Stage::Gather),
            ContextDecision::End => Cursor::Finished(Outcome::InsufficientContext),
        },
        Stage::Process => Cursor::Next(Stage::Summarize),
        Stage::Summarize => Cursor::Next(Stage::Questions),
        Stage::Questions => Cursor::AwaitingAnswers,
        Stage::Verify => match decide_assessment(state, policy) {
            AssessmentDecision::Complete => Cursor::Finished(Outcome::Mastered),
            AssessmentDecision::Remedial => Cursor::Next(Stage::Remedial),
        },
        Stage::Remedial => Cursor::Next(Stage::Questions),
    }
}
