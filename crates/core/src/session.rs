//! Session domain types: the learning checkpoint, assessment items, and the
//! state record threaded through every workflow stage.
//!
//! Stages never write to [`SessionState`] directly. Each stage returns a typed
//! output struct wrapped in [`StageOutput`], and [`SessionState::merge`] applies
//! it field by field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Number of options every assessment question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Unique identifier for a learning session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A percentage clamped to `[0, 100]`.
///
/// Used for both the relevance score and the assessment score. NaN maps to 0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Percent(f64);

impl Percent {
    pub const ZERO: Percent = Percent(0.0);
    pub const FULL: Percent = Percent(100.0);

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 100.0))
        }
    }

    /// `correct / total` as a percentage; an empty total scores 0.
    pub fn from_ratio(correct: usize, total: usize) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        Self::new(correct as f64 / total as f64 * 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Percent {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Percent> for f64 {
    fn from(p: Percent) -> Self {
        p.0
    }
}

impl std::fmt::Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

/// The learning unit being mastered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The main topic
    pub topic: String,

    /// Learning objectives, in order
    #[serde(default)]
    pub objectives: Vec<String>,

    /// Criteria that define success, in order
    #[serde(default)]
    pub success_criteria: Vec<String>,

    /// Gathered context; replaced on every pass of the context-retry cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Checkpoint {
    pub fn new(
        topic: impl Into<String>,
        objectives: Vec<String>,
        success_criteria: Vec<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            objectives,
            success_criteria,
            context: None,
        }
    }

    /// The gathered context, or `""` before the first gather pass.
    pub fn context_str(&self) -> &str {
        self.context.as_deref().unwrap_or("")
    }

    pub fn has_context(&self) -> bool {
        !self.context_str().trim().is_empty()
    }
}

/// A multiple-choice assessment item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

impl Question {
    pub fn new(question: impl Into<String>, options: [&str; OPTIONS_PER_QUESTION], correct_index: usize) -> Self {
        Self {
            question: question.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_index,
        }
    }

    /// Check the structural contract: exactly four options and an index that
    /// points at one of them.
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".into());
        }
        if self.options.len() != OPTIONS_PER_QUESTION {
            return Err(format!(
                "expected {OPTIONS_PER_QUESTION} options, got {} for '{}'",
                self.options.len(),
                self.question
            ));
        }
        if self.correct_index >= self.options.len() {
            return Err(format!(
                "correct_index {} out of range for '{}'",
                self.correct_index, self.question
            ));
        }
        Ok(())
    }

    pub fn correct_answer(&self) -> Option<&str> {
        self.options.get(self.correct_index).map(String::as_str)
    }
}

/// A workflow stage. The variant order matches the happy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    Gather,
    Validate,
    Process,
    Summarize,
    Questions,
    Verify,
    Remedial,
}

impl Stage {
    /// The entry stage of every session.
    pub const ENTRY: Stage = Stage::Start;

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Gather => "gather",
            Stage::Validate => "validate",
            Stage::Process => "process",
            Stage::Summarize => "summarize",
            Stage::Questions => "questions",
            Stage::Verify => "verify",
            Stage::Remedial => "remedial",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// An assessment reached the mastery threshold.
    Mastered,
    /// The context-retry cycle hit its ceiling without relevant context.
    InsufficientContext,
}

/// Where the engine will pick a session up next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cursor {
    /// Execute this stage next.
    Next(Stage),
    /// Suspended before `verify` until the caller submits answers.
    AwaitingAnswers,
    /// Terminal.
    Finished(Outcome),
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cursor::Next(stage) => write!(f, "next:{stage}"),
            Cursor::AwaitingAnswers => f.write_str("awaiting_answers"),
            Cursor::Finished(Outcome::Mastered) => f.write_str("finished:mastered"),
            Cursor::Finished(Outcome::InsufficientContext) => {
                f.write_str("finished:insufficient_context")
            }
        }
    }
}

/// Caller-facing status derived from a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    AwaitingAnswers,
    /// The latest assessment fell short of mastery; a fresh batch is pending.
    NeedsReview,
    Mastered,
    InsufficientContext,
}

impl SessionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::AwaitingAnswers => "awaiting_answers",
            SessionStatus::NeedsReview => "needs_review",
            SessionStatus::Mastered => "mastered",
            SessionStatus::InsufficientContext => "insufficient_context",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(SessionStatus::InProgress),
            "awaiting_answers" => Some(SessionStatus::AwaitingAnswers),
            "needs_review" => Some(SessionStatus::NeedsReview),
            "mastered" => Some(SessionStatus::Mastered),
            "insufficient_context" => Some(SessionStatus::InsufficientContext),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A simplified explanation produced for one missed question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Index into the batch that was assessed
    pub index: usize,
    pub question: String,
    pub correct_answer: String,
    pub explanation: String,
}

/// One completed assessment pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// The batch that was answered
    pub batch: Vec<Question>,
    pub answers: Vec<usize>,
    pub score: Percent,
    pub missed_indices: Vec<usize>,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// The single mutable aggregate threaded through the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: SessionId,

    pub checkpoint: Checkpoint,

    /// Every context fragment gathered, append-only
    #[serde(default)]
    pub gathered_info: Vec<String>,

    #[serde(default)]
    pub is_relevant: bool,

    #[serde(default)]
    pub relevance_score: Percent,

    /// Number of `validate` passes in the context-retry cycle
    #[serde(default)]
    pub iterations: u32,

    /// Progress log, append-only
    #[serde(default)]
    pub messages: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default)]
    pub chunk_count: usize,

    /// The current question batch
    #[serde(default)]
    pub mcqs: Vec<Question>,

    /// Every question text ever generated for this session
    #[serde(default)]
    pub seen_questions: BTreeSet<String>,

    /// Latest assessment score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Percent>,

    /// Indices into `mcqs` answered incorrectly in the latest assessment
    #[serde(default)]
    pub missed_indices: Vec<usize>,

    /// Explanations from the latest remediation pass
    #[serde(default)]
    pub explanations: Vec<Explanation>,

    #[serde(default)]
    pub attempts: Vec<Attempt>,

    /// Stages completed, in order
    #[serde(default)]
    pub trace: Vec<Stage>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh state for a new session.
    pub fn new(session_id: SessionId, checkpoint: Checkpoint) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            checkpoint,
            gathered_info: Vec::new(),
            is_relevant: false,
            relevance_score: Percent::ZERO,
            iterations: 0,
            messages: Vec::new(),
            summary: None,
            chunk_count: 0,
            mcqs: Vec::new(),
            seen_questions: BTreeSet::new(),
            score: None,
            missed_indices: Vec::new(),
            explanations: Vec::new(),
            attempts: Vec::new(),
            trace: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a stage's output. Each variant touches only its own fields.
    pub fn merge(&mut self, output: StageOutput) {
        match output {
            StageOutput::Start(o) => {
                self.iterations = o.iterations;
                self.messages.push(o.message);
            }
            StageOutput::Gather(o) => {
                self.gathered_info.push(o.context.clone());
                self.checkpoint.context = Some(o.context);
                self.messages.push(o.message);
            }
            StageOutput::Validate(o) => {
                self.is_relevant = o.is_relevant;
                self.relevance_score = o.relevance_score;
                self.iterations = o.iterations;
                self.messages.push(o.message);
            }
            StageOutput::Process(o) => {
                self.chunk_count = o.chunk_count;
                self.messages.push(o.message);
            }
            StageOutput::Summarize(o) => {
                self.summary = Some(o.summary);
                self.messages.push(o.message);
            }
            StageOutput::Questions(o) => {
                self.seen_questions
                    .extend(o.mcqs.iter().map(|q| q.question.clone()));
                self.mcqs = o.mcqs;
                // Indices from the previous batch are meaningless now.
                self.missed_indices.clear();
                self.messages.push(o.message);
            }
            StageOutput::Verify(o) => {
                self.score = Some(o.attempt.score);
                self.missed_indices = o.attempt.missed_indices.clone();
                self.attempts.push(o.attempt);
                self.messages.push(o.message);
            }
            StageOutput::Remedial(o) => {
                self.explanations = o.explanations;
                self.messages.extend(o.messages);
            }
        }
        self.updated_at = Utc::now();
    }

    /// The most recent assessment pass, if any.
    pub fn last_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }
}

/// Output of `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct StartOutput {
    pub iterations: u32,
    pub message: String,
}

/// Output of `gather`.
#[derive(Debug, Clone, PartialEq)]
pub struct GatherOutput {
    pub context: String,
    pub message: String,
}

/// Output of `validate`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidateOutput {
    pub is_relevant: bool,
    pub relevance_score: Percent,
    pub iterations: u32,
    pub message: String,
}

/// Output of `process`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub chunk_count: usize,
    pub message: String,
}

/// Output of `summarize`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizeOutput {
    pub summary: String,
    pub message: String,
}

/// Output of `questions`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionsOutput {
    pub mcqs: Vec<Question>,
    pub message: String,
}

/// Output of `verify`.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutput {
    pub attempt: Attempt,
    pub message: String,
}

/// Output of `remedial`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemedialOutput {
    pub explanations: Vec<Explanation>,
    pub messages: Vec<String>,
}

/// A stage's partial update, tagged by the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    Start(StartOutput),
    Gather(GatherOutput),
    Validate(ValidateOutput),
    Process(ProcessOutput),
    Summarize(SummarizeOutput),
    Questions(QuestionsOutput),
    Verify(VerifyOutput),
    Remedial(RemedialOutput),
}

impl StageOutput {
    pub fn stage(&self) -> Stage {
        match self {
            StageOutput::Start(_) => Stage::Start,
            StageOutput::Gather(_) => Stage::Gather,
            StageOutput::Validate(_) => Stage::Validate,
            StageOutput::Process(_) => Stage::Process,
            StageOutput::Summarize(_) => Stage::Summarize,
            StageOutput::Questions(_) => Stage::Questions,
            StageOutput::Verify(_) => Stage::Verify,
            StageOutput::Remedial(_) => Stage::Remedial,
        }
    }
}

/// The persisted unit: state plus the engine's position.
///
/// Written whole after every completed stage, so a reader never observes a
/// partially applied stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub state: SessionState,
    pub cursor: Cursor,
    /// Number of stages completed so far
    pub step: u64,
}

impl SessionRecord {
    /// A brand new record positioned at the entry stage.
    pub fn fresh(state: SessionState) -> Self {
        Self {
            state,
            cursor: Cursor::Next(Stage::ENTRY),
            step: 0,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.state.session_id
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.cursor, Cursor::Finished(_))
    }

    pub fn status(&self) -> SessionStatus {
        match self.cursor {
            Cursor::Finished(Outcome::Mastered) => SessionStatus::Mastered,
            Cursor::Finished(Outcome::InsufficientContext) => SessionStatus::InsufficientContext,
            _ if self.state.last_attempt().is_some_and(|a| !a.passed) => {
                SessionStatus::NeedsReview
            }
            Cursor::AwaitingAnswers => SessionStatus::AwaitingAnswers,
            Cursor::Next(_) => SessionStatus::InProgress,
        }
    }
}
