//! The workflow engine.
//!
//! Drives a session through the stage graph one stage at a time. After every
//! stage the engine merges the stage's output into a copy of the state,
//! appends the stage to the trace, computes the next cursor, bumps the step
//! counter and saves the whole record. A stage that fails leaves the
//! previously saved record untouched, so the same call can simply be retried.
//!
//! Only one caller advances a session at a time. Within an engine a second
//! call is refused up front; across engines and processes the store's
//! step compare-and-swap refuses the slower writer, and both surface as
//! [`Error::SessionBusy`].
//!
//! The engine suspends before `verify`: [`Engine::run`] and
//! [`Engine::resume`] stop at [`Cursor::AwaitingAnswers`], and
//! [`Engine::submit_answers`] picks the session up from there.

use autolearn_core::error::{Error, Result, StageError, StoreError};
use autolearn_core::event::{EventBus, SessionEvent};
use autolearn_core::ports::Collaborators;
use autolearn_core::session::{Cursor, SessionId, SessionRecord, SessionState, Stage, StageOutput};
use autolearn_core::store::SessionStore;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::graph::next_cursor;
use crate::policy::WorkflowPolicy;
use crate::stages;

/// Releases a session's in-flight slot when dropped.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<SessionId>>>,
    id: SessionId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.id);
    }
}

pub struct Engine {
    store: Arc<dyn SessionStore>,
    ports: Collaborators,
    policy: WorkflowPolicy,
    in_flight: Arc<Mutex<HashSet<SessionId>>>,
    events: Arc<EventBus>,
}

impl Engine {
    pub fn new(store: Arc<dyn SessionStore>, ports: Collaborators, policy: WorkflowPolicy) -> Self {
        Self {
            store,
            ports,
            policy,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            events: Arc::new(EventBus::default()),
        }
    }

    /// Publish session events on an existing bus.
    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn ports(&self) -> &Collaborators {
        &self.ports
    }

    pub fn policy(&self) -> &WorkflowPolicy {
        &self.policy
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Start a brand new session and run it to the first suspension point or
    /// terminal outcome.
    pub async fn run(&self, state: SessionState) -> Result<SessionRecord> {
        let id = state.session_id.clone();
        let _guard = self.claim(&id)?;

        if self.store.load(&id).await?.is_some() {
            return Err(Error::InvalidInput(format!("session {id} already exists")));
        }

        let record = SessionRecord::fresh(state);
        self.persist(&record, None).await?;
        info!(session_id = %id, topic = %record.state.checkpoint.topic, "Session started");

        self.drive(record).await
    }

    /// Continue a session from its last saved cursor. Suspended and finished
    /// sessions come back unchanged.
    pub async fn resume(&self, id: &SessionId) -> Result<SessionRecord> {
        let _guard = self.claim(id)?;
        let record = self.load(id).await?;
        debug!(session_id = %id, cursor = %record.cursor, step = record.step, "Resuming session");
        self.drive(record).await
    }

    /// Run until the session is waiting for answers (or has finished). Never
    /// executes `verify`.
    pub async fn advance_to_assessment(&self, id: &SessionId) -> Result<SessionRecord> {
        self.resume(id).await
    }

    /// Score the pending batch and continue: either to mastery or through
    /// remediation to the next batch.
    pub async fn submit_answers(&self, id: &SessionId, answers: &[usize]) -> Result<SessionRecord> {
        let _guard = self.claim(id)?;
        let record = self.load(id).await?;

        if record.cursor != Cursor::AwaitingAnswers {
            return Err(Error::NotAwaitingAnswers {
                session_id: id.clone(),
                cursor: record.cursor.to_string(),
            });
        }

        let expected = record.state.mcqs.len();
        if answers.len() != expected {
            return Err(Error::AnswerCountMismatch {
                expected,
                actual: answers.len(),
            });
        }

        if let Some(bad) = answers.iter().find(|a| !stages::is_valid_answer(**a)) {
            return Err(Error::InvalidInput(format!(
                "answer {bad} is not an option index (0-3)"
            )));
        }

        let output = stages::verify(&record.state, answers, &self.policy);
        let record = self.commit(&record, output).await?;
        self.drive(record).await
    }

    /// Remove a session and its checkpoint. Refused while a call on this
    /// engine is advancing it; a writer elsewhere fails its next save instead.
    pub async fn delete(&self, id: &SessionId) -> Result<bool> {
        let _guard = self.claim(id)?;
        let existed = self.store.delete(id).await?;
        if existed {
            info!(session_id = %id, "Session deleted");
        }
        Ok(existed)
    }

    async fn load(&self, id: &SessionId) -> Result<SessionRecord> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| Error::SessionNotFound(id.clone()))
    }

    /// Save `record` over the checkpoint at `expected_step`. Losing the
    /// race to another writer means the session is busy.
    async fn persist(&self, record: &SessionRecord, expected_step: Option<u64>) -> Result<()> {
        match self.store.save(record, expected_step).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict {
                session_id, found, ..
            }) => {
                warn!(session_id = %session_id, expected = ?expected_step, found = ?found, "Session advanced by another writer");
                Err(Error::SessionBusy(session_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn claim(&self, id: &SessionId) -> Result<InFlightGuard> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id.clone()) {
            return Err(Error::SessionBusy(id.clone()));
        }
        Ok(InFlightGuard {
            set: self.in_flight.clone(),
            id: id.clone(),
        })
    }

    /// Execute stages until the cursor is no longer `Next`.
    async fn drive(&self, mut record: SessionRecord) -> Result<SessionRecord> {
        while let Cursor::Next(stage) = record.cursor {
            let output = match self.execute(stage, &record.state).await {
                Ok(output) => output,
                Err(source) => {
                    let session_id = record.session_id().clone();
                    warn!(session_id = %session_id, stage = %stage, error = %source, "Stage failed");
                    self.events.publish(SessionEvent::StageFailed {
                        session_id: session_id.clone(),
                        stage,
                        error_message: source.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(Error::StageFailed {
                        session_id,
                        stage,
                        source,
                    });
                }
            };
            record = self.commit(&record, output).await?;
        }
        Ok(record)
    }

    async fn execute(
        &self,
        stage: Stage,
        state: &SessionState,
    ) -> std::result::Result<StageOutput, StageError> {
        match stage {
            Stage::Start => Ok(stages::start(state)),
            Stage::Gather => stages::gather(state, &self.ports).await,
            Stage::Validate => stages::validate(state, &self.ports).await,
            Stage::Process => Ok(stages::process(state, &self.policy)),
            Stage::Summarize => stages::summarize(state, &self.ports).await,
            Stage::Questions => stages::questions(state, &self.ports, &self.policy).await,
            Stage::Verify => Err(StageError::MissingInput(
                "verify runs only through submit_answers".into(),
            )),
            Stage::Remedial => stages::remedial(state, &self.ports, &self.policy).await,
        }
    }

    /// Merge, advance and persist. The caller's record is left as it was.
    async fn commit(&self, record: &SessionRecord, output: StageOutput) -> Result<SessionRecord> {
        let stage = output.stage();
        let mut state = record.state.clone();
        state.merge(output);
        state.trace.push(stage);

        let cursor = next_cursor(stage, &state, &self.policy);
        let next = SessionRecord {
            state,
            cursor,
            step: record.step + 1,
        };
        self.persist(&next, Some(record.step)).await?;

        let session_id = next.session_id().clone();
        info!(session_id = %session_id, stage = %stage, step = next.step, cursor = %cursor, "Stage completed");
        self.events.publish(SessionEvent::StageCompleted {
            session_id: session_id.clone(),
            stage,
            step: next.step,
            timestamp: Utc::now(),
        });

        match cursor {
            Cursor::AwaitingAnswers => self.events.publish(SessionEvent::AwaitingAnswers {
                session_id,
                questions: next.state.mcqs.len(),
                timestamp: Utc::now(),
            }),
            Cursor::Finished(outcome) => {
                info!(session_id = %session_id, ?outcome, "Session finished");
                self.events.publish(SessionEvent::Finished {
                    session_id,
                    outcome,
                    timestamp: Utc::now(),
                });
            }
            Cursor::Next(_) => {}
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedCollaborators, question};
    use autolearn_core::session::{Checkpoint, Outcome, SessionStatus};
    use autolearn_store::InMemoryStore;

    fn new_state(id: &str) -> SessionState {
        SessionState::new(
            SessionId::from(id),
            Checkpoint::new(
                "Rust ownership",
                vec!["Moves".into(), "Borrows".into()],
                vec!["Explain a move".into()],
            ),
        )
    }

    fn engine(script: &ScriptedCollaborators) -> (Engine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let engine = Engine::new(store.clone(), script.collaborators(), WorkflowPolicy::default());
        (engine, store)
    }

    fn correct_answers(record: &SessionRecord) -> Vec<usize> {
        record.state.mcqs.iter().map(|q| q.correct_index).collect()
    }

    fn wrong_answers(record: &SessionRecord) -> Vec<usize> {
        record
            .state
            .mcqs
            .iter()
            .map(|q| (q.correct_index + 1) % 4)
            .collect()
    }

    #[tokio::test]
    async fn happy_path_suspends_then_masters() {
        let script = ScriptedCollaborators::new();
        let (engine, store) = engine(&script);

        let record = engine.run(new_state("a")).await.unwrap();
        assert_eq!(record.cursor, Cursor::AwaitingAnswers);
        assert_eq!(
            record.state.trace,
            vec![
                Stage::Start,
                Stage::Gather,
                Stage::Validate,
                Stage::Process,
                Stage::Summarize,
                Stage::Questions
            ]
        );
        assert_eq!(record.step, 6);
        assert_eq!(record.state.iterations, 1);
        assert_eq!(record.state.mcqs.len(), 3);
        assert!(record.state.summary.is_some());
        assert!(record.state.chunk_count >= 1);

        let answers = correct_answers(&record);
        let done = engine.submit_answers(&SessionId::from("a"), &answers).await.unwrap();
        assert_eq!(done.cursor, Cursor::Finished(Outcome::Mastered));
        assert_eq!(done.state.trace.last(), Some(&Stage::Verify));
        assert_eq!(done.state.score.unwrap().value(), 100.0);
        assert!(done.state.missed_indices.is_empty());

        let stored = store.load(&SessionId::from("a")).await.unwrap().unwrap();
        assert_eq!(stored, done);
        assert_eq!(stored.status(), SessionStatus::Mastered);
    }

    #[tokio::test]
    async fn irrelevant_context_retries_then_passes() {
        let script = ScriptedCollaborators::new()
            .with_web(&["junk", "still junk", "good context"])
            .with_relevance(&[(false, 20.0), (false, 35.0), (true, 85.0)]);
        let (engine, _) = engine(&script);

        let record = engine.run(new_state("b")).await.unwrap();
        assert_eq!(record.cursor, Cursor::AwaitingAnswers);
        assert_eq!(record.state.iterations, 3);
        assert_eq!(record.state.gathered_info, vec!["junk", "still junk", "good context"]);
        assert_eq!(record.state.checkpoint.context.as_deref(), Some("good context"));
        assert_eq!(record.state.relevance_score.value(), 85.0);
        assert_eq!(script.calls("search_web"), 3);
    }

    #[tokio::test]
    async fn iteration_ceiling_ends_with_insufficient_context() {
        let script = ScriptedCollaborators::new().with_relevance(&[(false, 10.0)]);
        let (engine, _) = engine(&script);

        let record = engine.run(new_state("c")).await.unwrap();
        assert_eq!(record.cursor, Cursor::Finished(Outcome::InsufficientContext));
        assert_eq!(record.status(), SessionStatus::InsufficientContext);
        assert_eq!(record.state.iterations, 3);
        assert_eq!(script.calls("score"), 3);
        assert_eq!(script.calls("summarize"), 0);
        let validates = record.state.trace.iter().filter(|s| **s == Stage::Validate).count();
        assert_eq!(validates, 3);
    }

    #[tokio::test]
    async fn empty_context_never_reaches_the_judge() {
        let script = ScriptedCollaborators::new().with_web(&[""]);
        let (engine, _) = engine(&script);

        let record = engine.run(new_state("empty")).await.unwrap();
        assert_eq!(record.cursor, Cursor::Finished(Outcome::InsufficientContext));
        assert_eq!(script.calls("score"), 0);
        assert!(!record.state.is_relevant);
    }

    #[tokio::test]
    async fn failed_assessment_remediates_and_regenerates() {
        let script = ScriptedCollaborators::new();
        let (engine, _) = engine(&script);
        let id = SessionId::from("d");

        let first = engine.run(new_state("d")).await.unwrap();
        let first_batch: Vec<String> = first.state.mcqs.iter().map(|q| q.question.clone()).collect();

        let second = engine.submit_answers(&id, &wrong_answers(&first)).await.unwrap();
        assert_eq!(second.cursor, Cursor::AwaitingAnswers);
        assert_eq!(second.status(), SessionStatus::NeedsReview);
        assert_eq!(second.state.score, Some(autolearn_core::session::Percent::ZERO));
        assert_eq!(second.state.explanations.len(), 3);
        assert!(second.state.missed_indices.is_empty());
        assert_eq!(second.state.attempts.len(), 1);
        assert_eq!(second.state.attempts[0].missed_indices, vec![0, 1, 2]);
        assert_eq!(
            &second.state.trace[6..],
            &[Stage::Verify, Stage::Remedial, Stage::Questions]
        );

        // The new batch avoided everything seen before.
        for q in &second.state.mcqs {
            assert!(!first_batch.contains(&q.question));
        }
        assert_eq!(script.avoid_sets()[1].len(), 3);
        assert_eq!(second.state.seen_questions.len(), 6);

        let done = engine.submit_answers(&id, &correct_answers(&second)).await.unwrap();
        assert_eq!(done.cursor, Cursor::Finished(Outcome::Mastered));
        assert_eq!(done.state.attempts.len(), 2);
    }

    #[tokio::test]
    async fn answer_count_mismatch_is_rejected_before_scoring() {
        let script = ScriptedCollaborators::new();
        let (engine, store) = engine(&script);
        let id = SessionId::from("e");

        let record = engine.run(new_state("e")).await.unwrap();
        let err = engine.submit_answers(&id, &[0, 1]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::AnswerCountMismatch {
                expected: 3,
                actual: 2
            }
        ));

        let stored = store.load(&id).await.unwrap().unwrap();
        assert_eq!(stored, record);
        assert!(stored.state.attempts.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_answer_is_rejected() {
        let script = ScriptedCollaborators::new();
        let (engine, _) = engine(&script);
        engine.run(new_state("range")).await.unwrap();

        let err = engine
            .submit_answers(&SessionId::from("range"), &[0, 1, 9])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn submit_requires_suspension() {
        let script = ScriptedCollaborators::new().with_relevance(&[(false, 0.0)]);
        let (engine, _) = engine(&script);
        engine.run(new_state("f")).await.unwrap();

        let err = engine.submit_answers(&SessionId::from("f"), &[]).await.unwrap_err();
        assert!(matches!(err, Error::NotAwaitingAnswers { .. }));
    }

    #[tokio::test]
    async fn stage_failure_keeps_last_checkpoint_and_retry_continues() {
        let script = ScriptedCollaborators::new();
        script.fail_next("summarize", 1);
        let (engine, store) = engine(&script);
        let id = SessionId::from("g");

        let err = engine.run(new_state("g")).await.unwrap_err();
        match &err {
            Error::StageFailed { session_id, stage, .. } => {
                assert_eq!(session_id, &id);
                assert_eq!(*stage, Stage::Summarize);
            }
            other => panic!("expected StageFailed, got {other:?}"),
        }

        let stored = store.load(&id).await.unwrap().unwrap();
        assert_eq!(stored.cursor, Cursor::Next(Stage::Summarize));
        assert_eq!(stored.step, 4);
        assert_eq!(stored.state.trace.last(), Some(&Stage::Process));
        assert!(stored.state.summary.is_none());

        let resumed = engine.resume(&id).await.unwrap();
        assert_eq!(resumed.cursor, Cursor::AwaitingAnswers);
        assert_eq!(resumed.step, 6);
        assert_eq!(script.calls("search_web"), 1);
    }

    #[tokio::test]
    async fn malformed_batch_fails_the_stage() {
        let script = ScriptedCollaborators::new()
            .with_batches(vec![vec![question("Only one", 0)]]);
        let (engine, store) = engine(&script);

        let err = engine.run(new_state("h")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::StageFailed {
                stage: Stage::Questions,
                source: StageError::MalformedGeneratorOutput(_),
                ..
            }
        ));
        let stored = store.load(&SessionId::from("h")).await.unwrap().unwrap();
        assert_eq!(stored.cursor, Cursor::Next(Stage::Questions));
        assert!(stored.state.mcqs.is_empty());
    }

    #[tokio::test]
    async fn resume_is_idempotent_for_suspended_and_finished_sessions() {
        let script = ScriptedCollaborators::new();
        let (engine, _) = engine(&script);
        let id = SessionId::from("i");

        let suspended = engine.run(new_state("i")).await.unwrap();
        let again = engine.advance_to_assessment(&id).await.unwrap();
        assert_eq!(again, suspended);
        assert_eq!(script.calls("generate"), 1);

        let done = engine.submit_answers(&id, &correct_answers(&suspended)).await.unwrap();
        let after = engine.resume(&id).await.unwrap();
        assert_eq!(after, done);
    }

    #[tokio::test]
    async fn resume_from_mid_run_matches_uninterrupted_trace() {
        let script = ScriptedCollaborators::new();
        let (engine, store) = engine(&script);
        let id = SessionId::from("j");

        // Simulate a process that saved its record after `validate` and died.
        let mut state = new_state("j");
        state.checkpoint.context = Some("Ownership moves values; borrows lend them.".into());
        state.gathered_info.push("Ownership moves values; borrows lend them.".into());
        state.is_relevant = true;
        state.iterations = 1;
        state.trace = vec![Stage::Start, Stage::Gather, Stage::Validate];
        let record = SessionRecord {
            state,
            cursor: Cursor::Next(Stage::Process),
            step: 3,
        };
        store.save(&record, None).await.unwrap();

        let resumed = engine.resume(&id).await.unwrap();
        assert_eq!(
            resumed.state.trace,
            vec![
                Stage::Start,
                Stage::Gather,
                Stage::Validate,
                Stage::Process,
                Stage::Summarize,
                Stage::Questions
            ]
        );
        assert_eq!(script.calls("search_web"), 0);
        assert_eq!(script.calls("score"), 0);
    }

    #[tokio::test]
    async fn concurrent_calls_on_one_session_are_refused() {
        let script = ScriptedCollaborators::new();
        let release = script.hold("summarize");
        let store = Arc::new(InMemoryStore::new());
        let engine = Arc::new(Engine::new(
            store.clone(),
            script.collaborators(),
            WorkflowPolicy::default(),
        ));
        let id = SessionId::from("k");

        let runner = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run(new_state("k")).await })
        };
        while script.calls("summarize") == 0 {
            tokio::task::yield_now().await;
        }

        assert!(matches!(engine.resume(&id).await, Err(Error::SessionBusy(_))));
        assert!(matches!(
            engine.submit_answers(&id, &[0, 0, 0]).await,
            Err(Error::SessionBusy(_))
        ));

        // Other sessions are unaffected.
        let other = ScriptedCollaborators::new();
        let other_engine = Engine::new(store.clone(), other.collaborators(), WorkflowPolicy::default());
        assert!(other_engine.run(new_state("other")).await.is_ok());

        release.notify_one();
        let record = runner.await.unwrap().unwrap();
        assert_eq!(record.cursor, Cursor::AwaitingAnswers);

        // The slot is free again once the run is over.
        assert!(engine.resume(&id).await.is_ok());
    }

    #[tokio::test]
    async fn engines_sharing_a_store_do_not_both_advance_a_session() {
        let store = Arc::new(InMemoryStore::new());
        let slow = ScriptedCollaborators::new();
        let release = slow.hold("summarize");
        let a = Arc::new(Engine::new(store.clone(), slow.collaborators(), WorkflowPolicy::default()));
        let fast = ScriptedCollaborators::new();
        let b = Engine::new(store.clone(), fast.collaborators(), WorkflowPolicy::default());
        let id = SessionId::from("shared");

        let runner = {
            let a = a.clone();
            tokio::spawn(async move { a.run(new_state("shared")).await })
        };
        while slow.calls("summarize") == 0 {
            tokio::task::yield_now().await;
        }

        // B finds the checkpoint A saved before summarize and takes it over.
        let taken = b.resume(&id).await.unwrap();
        assert_eq!(taken.cursor, Cursor::AwaitingAnswers);
        assert_eq!(taken.step, 6);

        // A wakes up holding a stale step and is refused.
        release.notify_one();
        let err = runner.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::SessionBusy(ref busy) if busy == &id));
        assert_eq!(slow.calls("generate"), 0);

        let stored = store.load(&id).await.unwrap().unwrap();
        assert_eq!(stored, taken);
        assert_eq!(stored.state.trace.iter().filter(|s| **s == Stage::Summarize).count(), 1);

        // The refused engine is free to pick the session up again.
        assert_eq!(a.resume(&id).await.unwrap(), taken);
    }

    #[tokio::test]
    async fn delete_refuses_in_flight_session() {
        let script = ScriptedCollaborators::new();
        let release = script.hold("summarize");
        let (engine, store) = engine(&script);
        let engine = Arc::new(engine);
        let id = SessionId::from("del");

        let runner = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run(new_state("del")).await })
        };
        while script.calls("summarize") == 0 {
            tokio::task::yield_now().await;
        }
        assert!(matches!(engine.delete(&id).await, Err(Error::SessionBusy(_))));

        release.notify_one();
        runner.await.unwrap().unwrap();
        assert!(engine.delete(&id).await.unwrap());
        assert!(!engine.delete(&id).await.unwrap());
        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_rejects_existing_session() {
        let script = ScriptedCollaborators::new();
        let (engine, _) = engine(&script);
        engine.run(new_state("dup")).await.unwrap();
        assert!(matches!(
            engine.run(new_state("dup")).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let script = ScriptedCollaborators::new();
        let (engine, _) = engine(&script);
        assert!(matches!(
            engine.resume(&SessionId::from("ghost")).await,
            Err(Error::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn seen_questions_only_grow() {
        let script = ScriptedCollaborators::new();
        let (engine, _) = engine(&script);
        let id = SessionId::from("m");

        let mut record = engine.run(new_state("m")).await.unwrap();
        let mut previous = record.state.seen_questions.clone();
        for _ in 0..3 {
            record = engine.submit_answers(&id, &wrong_answers(&record)).await.unwrap();
            assert!(record.state.seen_questions.is_superset(&previous));
            assert!(record.state.seen_questions.len() > previous.len());
            previous = record.state.seen_questions.clone();
        }
        assert_eq!(record.state.attempts.len(), 3);
    }

    #[tokio::test]
    async fn events_follow_the_run() {
        let script = ScriptedCollaborators::new();
        let (engine, _) = engine(&script);
        let mut rx = engine.events().subscribe();

        engine.run(new_state("ev")).await.unwrap();

        let mut completed = 0;
        let mut awaiting = false;
        while let Ok(event) = rx.try_recv() {
            match event.as_ref() {
                SessionEvent::StageCompleted { .. } => completed += 1,
                SessionEvent::AwaitingAnswers { questions, .. } => {
                    awaiting = true;
                    assert_eq!(*questions, 3);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(completed, 6);
        assert!(awaiting);
    }
}
