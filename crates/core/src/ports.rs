//! Collaborator ports: the narrow contracts behind which every content
//! producer lives.
//!
//! The workflow engine never looks inside these. Implementations include the
//! LLM- and search-backed adapters in `autolearn-providers`, fixed-value
//! offline stubs, and scripted mocks in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::CollaboratorError;
use crate::session::{Percent, Question};

/// The relevance gate's verdict on a piece of gathered context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    pub is_relevant: bool,
    pub score: Percent,
}

impl Relevance {
    pub fn new(is_relevant: bool, score: f64) -> Self {
        Self {
            is_relevant,
            score: Percent::new(score),
        }
    }

    pub fn irrelevant() -> Self {
        Self::new(false, 0.0)
    }
}

/// Where study context comes from.
#[async_trait]
pub trait ContextSource: Send + Sync {
    fn name(&self) -> &str;

    /// Search the learner's own notes. An empty string means "not found".
    async fn search_notes(&self, topic: &str) -> Result<String, CollaboratorError>;

    /// Search the web for the topic and its objectives.
    async fn search_web(
        &self,
        topic: &str,
        objectives: &[String],
    ) -> Result<String, CollaboratorError>;

    /// Look for simple, analogy-driven material on one concept.
    async fn search_simple_explanation(&self, concept: &str) -> Result<String, CollaboratorError>;
}

/// Judges whether gathered context covers the learning objectives.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    fn name(&self) -> &str;

    async fn score(
        &self,
        topic: &str,
        objectives: &[String],
        context: &str,
    ) -> Result<Relevance, CollaboratorError>;
}

/// Turns context into study material.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    async fn summarize(&self, context: &str, topic: &str) -> Result<String, CollaboratorError>;
}

/// Produces a batch of multiple-choice questions.
///
/// Implementations should return 3–5 questions with four options each and
/// steer away from texts in `avoid`. The engine validates the batch; it does
/// not trust this contract.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        context: &str,
        topic: &str,
        avoid: &BTreeSet<String>,
    ) -> Result<Vec<Question>, CollaboratorError>;
}

/// Writes a simplified explanation for a concept the learner missed.
#[async_trait]
pub trait ExplanationGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn explain(
        &self,
        question: &str,
        primary_context: &str,
        simple_context: &str,
    ) -> Result<String, CollaboratorError>;
}

/// The collaborator registry, built once at process start and injected into
/// the engine.
#[derive(Clone)]
pub struct Collaborators {
    pub context: Arc<dyn ContextSource>,
    pub relevance: Arc<dyn RelevanceJudge>,
    pub summarizer: Arc<dyn Summarizer>,
    pub questions: Arc<dyn QuestionGenerator>,
    pub explainer: Arc<dyn ExplanationGenerator>,
}

impl Collaborators {
    pub fn new(
        context: Arc<dyn ContextSource>,
        relevance: Arc<dyn RelevanceJudge>,
        summarizer: Arc<dyn Summarizer>,
        questions: Arc<dyn QuestionGenerator>,
        explainer: Arc<dyn ExplanationGenerator>,
    ) -> Self {
        Self {
            context,
            relevance,
            summarizer,
            questions,
            explainer,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("context", &self.context.name())
            .field("relevance", &self.relevance.name())
            .field("summarizer", &self.summarizer.name())
            .field("questions", &self.questions.name())
            .field("explainer", &self.explainer.name())
            .finish()
    }
}
