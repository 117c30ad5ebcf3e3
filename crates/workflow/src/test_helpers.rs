//! Shared test helpers: a scripted implementation of every collaborator port.
//!
//! Responses are queues where the last entry repeats once the queue is down
//! to one element. Every call is counted by method name, and any method can
//! be told to fail its next N calls or to block until released.

use async_trait::async_trait;
use autolearn_core::error::CollaboratorError;
use autolearn_core::ports::{
    Collaborators, ContextSource, ExplanationGenerator, QuestionGenerator, Relevance,
    RelevanceJudge, Summarizer,
};
use autolearn_core::session::{Checkpoint, Question, SessionId, SessionState};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// A question whose options are `option 0` .. `option 3`.
pub fn question(text: &str, correct_index: usize) -> Question {
    Question {
        question: text.to_string(),
        options: (0..4).map(|i| format!("option {i}")).collect(),
        correct_index,
    }
}

/// A state that already passed the context gate.
pub fn relevant_state() -> SessionState {
    let mut state = SessionState::new(
        SessionId::from("scripted"),
        Checkpoint::new("Rust ownership", vec!["Moves".into(), "Borrows".into()], vec![]),
    );
    state.checkpoint.context = Some("Ownership moves values; borrows lend them.".into());
    state.is_relevant = true;
    state
}

fn next_from<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().unwrap();
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[derive(Default)]
struct Script {
    notes: Mutex<String>,
    web: Mutex<VecDeque<String>>,
    relevance: Mutex<VecDeque<Relevance>>,
    summary: Mutex<String>,
    batches: Mutex<VecDeque<Vec<Question>>>,
    failures: Mutex<HashMap<&'static str, usize>>,
    holds: Mutex<HashMap<&'static str, Arc<Notify>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    avoid_seen: Mutex<Vec<BTreeSet<String>>>,
}

impl Script {
    async fn enter(&self, method: &'static str) -> Result<(), CollaboratorError> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;

        let hold = self.holds.lock().unwrap().remove(method);
        if let Some(notify) = hold {
            notify.notified().await;
        }

        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(method) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(CollaboratorError::Unavailable(format!("scripted {method} failure")))
            }
            _ => Ok(()),
        }
    }

    fn fresh_batch(avoid: &BTreeSet<String>) -> Vec<Question> {
        let start = avoid.len();
        (0..3)
            .map(|i| question(&format!("Scripted question {}", start + i), (start + i) % 4))
            .collect()
    }
}

/// Scripted collaborators with call counting.
#[derive(Clone, Default)]
pub struct ScriptedCollaborators {
    script: Arc<Script>,
}

impl ScriptedCollaborators {
    /// Defaults: no notes, one web context, relevant at 90, three fresh
    /// questions per batch.
    pub fn new() -> Self {
        let this = Self::default();
        this.script
            .web
            .lock()
            .unwrap()
            .push_back("Ownership moves values; borrows lend them.".into());
        this.script
            .relevance
            .lock()
            .unwrap()
            .push_back(Relevance::new(true, 90.0));
        *this.script.summary.lock().unwrap() = "- Ownership\n- Borrowing".into();
        this
    }

    pub fn with_notes(self, notes: &str) -> Self {
        *self.script.notes.lock().unwrap() = notes.to_string();
        self
    }

    pub fn with_web(self, contexts: &[&str]) -> Self {
        *self.script.web.lock().unwrap() = contexts.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_relevance(self, verdicts: &[(bool, f64)]) -> Self {
        *self.script.relevance.lock().unwrap() = verdicts
            .iter()
            .map(|(relevant, score)| Relevance::new(*relevant, *score))
            .collect();
        self
    }

    /// Fixed batches, served in order; the last one repeats.
    pub fn with_batches(self, batches: Vec<Vec<Question>>) -> Self {
        *self.script.batches.lock().unwrap() = batches.into_iter().collect();
        self
    }

    /// Make the next `times` calls of `method` fail.
    pub fn fail_next(&self, method: &'static str, times: usize) {
        self.script.failures.lock().unwrap().insert(method, times);
    }

    /// Make the next call to `method` wait until the returned notify is signalled.
    pub fn hold(&self, method: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.script
            .holds
            .lock()
            .unwrap()
            .insert(method, notify.clone());
        notify
    }

    pub fn calls(&self, method: &str) -> usize {
        self.script
            .calls
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    /// The `avoid` sets the question generator was called with, in order.
    pub fn avoid_sets(&self) -> Vec<BTreeSet<String>> {
        self.script.avoid_seen.lock().unwrap().clone()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.script.clone(),
            self.script.clone(),
            self.script.clone(),
            self.script.clone(),
            self.script.clone(),
        )
    }
}

#[async_trait]
impl ContextSource for Script {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn search_notes(&self, _topic: &str) -> Result<String, CollaboratorError> {
        self.enter("search_notes").await?;
        Ok(self.notes.lock().unwrap().clone())
    }

    async fn search_web(
        &self,
        _topic: &str,
        _objectives: &[String],
    ) -> Result<String, CollaboratorError> {
        self.enter("search_web").await?;
        Ok(next_from(&self.web).unwrap_or_default())
    }

    async fn search_simple_explanation(&self, concept: &str) -> Result<String, CollaboratorError> {
        self.enter("search_simple_explanation").await?;
        Ok(format!("simple take on {concept}"))
    }
}

#[async_trait]
impl RelevanceJudge for Script {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn score(
        &self,
        _topic: &str,
        _objectives: &[String],
        _context: &str,
    ) -> Result<Relevance, CollaboratorError> {
        self.enter("score").await?;
        Ok(next_from(&self.relevance).unwrap_or_else(Relevance::irrelevant))
    }
}

#[async_trait]
impl Summarizer for Script {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn summarize(&self, _context: &str, _topic: &str) -> Result<String, CollaboratorError> {
        self.enter("summarize").await?;
        Ok(self.summary.lock().unwrap().clone())
    }
}

#[async_trait]
impl QuestionGenerator for Script {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        _context: &str,
        _topic: &str,
        avoid: &BTreeSet<String>,
    ) -> Result<Vec<Question>, CollaboratorError> {
        self.enter("generate").await?;
        self.avoid_seen.lock().unwrap().push(avoid.clone());
        Ok(next_from(&self.batches).unwrap_or_else(|| Self::fresh_batch(avoid)))
    }
}

#[async_trait]
impl ExplanationGenerator for Script {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn explain(
        &self,
        question: &str,
        _primary_context: &str,
        simple_context: &str,
    ) -> Result<String, CollaboratorError> {
        self.enter("explain").await?;
        Ok(format!("Explained '{question}' using: {simple_context}"))
    }
}
