//! Learning-session facade over the [`Engine`].
//!
//! This is the surface callers drive a learner through: create a session,
//! read its summary and questions, submit answers, ask for remediation and
//! browse history. Views never reveal `correct_index` for a pending batch.

use autolearn_core::error::{Error, Result, StageError};
use autolearn_core::ports::Collaborators;
use autolearn_core::session::{
    Checkpoint, Cursor, Explanation, Percent, Question, SessionId, SessionRecord, SessionState,
    SessionStatus, Stage,
};
use autolearn_core::store::{SessionStore, SessionSummary};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::engine::Engine;
use crate::policy::WorkflowPolicy;
use crate::stages;

/// What a learner asks to study.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSession {
    pub topic: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
}

/// A question as shown to the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub index: usize,
    pub question: String,
    pub options: Vec<String>,
}

impl QuestionView {
    fn from_question(index: usize, q: &Question) -> Self {
        Self {
            index,
            question: q.question.clone(),
            options: q.options.clone(),
        }
    }
}

fn question_views(mcqs: &[Question]) -> Vec<QuestionView> {
    mcqs.iter()
        .enumerate()
        .map(|(i, q)| QuestionView::from_question(i, q))
        .collect()
}

/// One missed question with the answer given and the right one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub index: usize,
    pub question: String,
    pub your_answer: String,
    pub correct_answer: String,
}

/// The result of submitting answers for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub session_id: SessionId,
    pub score: Percent,
    pub passed: bool,
    pub missed_indices: Vec<usize>,
    pub corrections: Vec<Correction>,
    /// Explanations produced by remediation for this batch
    pub explanations: Vec<Explanation>,
    pub status: SessionStatus,
    /// The fresh batch when the session went back to assessment
    pub next_questions: Vec<QuestionView>,
}

/// A readable snapshot of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: SessionId,
    pub topic: String,
    pub objectives: Vec<String>,
    pub success_criteria: Vec<String>,
    pub status: SessionStatus,
    pub cursor: Cursor,
    pub step: u64,
    pub iterations: u32,
    pub relevance_score: Percent,
    pub summary: Option<String>,
    pub chunk_count: usize,
    pub questions: Vec<QuestionView>,
    pub score: Option<Percent>,
    pub attempts: usize,
    pub explanations: Vec<Explanation>,
    pub messages: Vec<String>,
    pub trace: Vec<Stage>,
}

impl SessionView {
    pub fn from_record(record: &SessionRecord) -> Self {
        let state = &record.state;
        let questions = if record.cursor == Cursor::AwaitingAnswers {
            question_views(&state.mcqs)
        } else {
            Vec::new()
        };
        Self {
            id: state.session_id.clone(),
            topic: state.checkpoint.topic.clone(),
            objectives: state.checkpoint.objectives.clone(),
            success_criteria: state.checkpoint.success_criteria.clone(),
            status: record.status(),
            cursor: record.cursor,
            step: record.step,
            iterations: state.iterations,
            relevance_score: state.relevance_score,
            summary: state.summary.clone(),
            chunk_count: state.chunk_count,
            questions,
            score: state.score,
            attempts: state.attempts.len(),
            explanations: state.explanations.clone(),
            messages: state.messages.clone(),
            trace: state.trace.clone(),
        }
    }
}

pub struct LearningService {
    engine: Engine,
}

impl LearningService {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn from_parts(
        store: Arc<dyn SessionStore>,
        ports: Collaborators,
        policy: WorkflowPolicy,
    ) -> Self {
        Self::new(Engine::new(store, ports, policy))
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Create a session and run it to the first assessment (or to
    /// `InsufficientContext`).
    pub async fn create_session(&self, request: NewSession) -> Result<SessionView> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(Error::InvalidInput("topic must not be empty".into()));
        }

        let clean = |items: Vec<String>| -> Vec<String> {
            items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let checkpoint = Checkpoint::new(
            topic,
            clean(request.objectives),
            clean(request.success_criteria),
        );
        let state = SessionState::new(SessionId::new(), checkpoint);
        info!(session_id = %state.session_id, topic = %topic, "Creating learning session");

        let record = self.engine.run(state).await?;
        Ok(SessionView::from_record(&record))
    }

    /// Continue an interrupted session.
    pub async fn resume(&self, id: &SessionId) -> Result<SessionView> {
        let record = self.engine.advance_to_assessment(id).await?;
        Ok(SessionView::from_record(&record))
    }

    pub async fn session(&self, id: &SessionId) -> Result<SessionView> {
        Ok(SessionView::from_record(&self.load(id).await?))
    }

    pub async fn summary(&self, id: &SessionId) -> Result<Option<String>> {
        Ok(self.load(id).await?.state.summary)
    }

    /// The pending batch, without answers. Empty unless the session is
    /// waiting for answers.
    pub async fn questions(&self, id: &SessionId) -> Result<Vec<QuestionView>> {
        Ok(SessionView::from_record(&self.load(id).await?).questions)
    }

    pub async fn submit_answers(&self, id: &SessionId, answers: &[usize]) -> Result<AssessmentReport> {
        let record = self.engine.submit_answers(id, answers).await?;
        let state = &record.state;
        let attempt = state
            .last_attempt()
            .ok_or_else(|| Error::InvalidInput(format!("session {id} has no assessment")))?;

        let corrections = attempt
            .missed_indices
            .iter()
            .filter_map(|&i| {
                let q = attempt.batch.get(i)?;
                let given = attempt.answers.get(i).copied().unwrap_or_default();
                Some(Correction {
                    index: i,
                    question: q.question.clone(),
                    your_answer: q.options.get(given).cloned().unwrap_or_default(),
                    correct_answer: q.correct_answer().unwrap_or_default().to_string(),
                })
            })
            .collect();

        let explanations = if attempt.passed {
            Vec::new()
        } else {
            state.explanations.clone()
        };

        let next_questions = if record.cursor == Cursor::AwaitingAnswers {
            question_views(&state.mcqs)
        } else {
            Vec::new()
        };

        Ok(AssessmentReport {
            session_id: id.clone(),
            score: attempt.score,
            passed: attempt.passed,
            missed_indices: attempt.missed_indices.clone(),
            corrections,
            explanations,
            status: record.status(),
            next_questions,
        })
    }

    /// Explanations for questions of the most recently assessed batch.
    ///
    /// Stored explanations are returned as they are; any others are generated
    /// on the spot. The session itself is never modified.
    pub async fn remediation(&self, id: &SessionId, indices: &[usize]) -> Result<Vec<Explanation>> {
        let record = self.load(id).await?;
        let state = &record.state;
        let attempt = state
            .last_attempt()
            .ok_or_else(|| Error::InvalidInput(format!("session {id} has no assessed batch")))?;
        let batch = &attempt.batch;

        if let Some(bad) = indices.iter().find(|i| **i >= batch.len()) {
            return Err(Error::InvalidInput(format!(
                "question index {bad} outside batch of {}",
                batch.len()
            )));
        }

        let context = state.checkpoint.context_str();
        let ports = self.engine.ports();
        let explanations = try_join_all(indices.iter().map(|&i| async move {
            let stored = state
                .explanations
                .iter()
                .find(|e| e.index == i && e.question == batch[i].question);
            match stored {
                Some(e) => Ok(e.clone()),
                None => stages::explain_question(ports, i, &batch[i], context).await,
            }
        }))
        .await
        .map_err(|e| Error::StageFailed {
            session_id: id.clone(),
            stage: Stage::Remedial,
            source: StageError::Collaborator(e),
        })?;

        Ok(explanations)
    }

    /// Every session, newest first.
    pub async fn history(&self) -> Result<Vec<SessionSummary>> {
        Ok(self.engine.store().list().await?)
    }

    /// Forget a session. Returns whether it existed.
    pub async fn delete_session(&self, id: &SessionId) -> Result<bool> {
        self.engine.delete(id).await
    }

    async fn load(&self, id: &SessionId) -> Result<SessionRecord> {
        self.engine
            .store()
            .load(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.clone()))
    }
}
