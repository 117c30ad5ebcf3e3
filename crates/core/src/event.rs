//! Session event system: observability for workflow progress.
//!
//! The engine publishes an event for every stage transition. The CLI (or any
//! other observer) can subscribe without being coupled to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::session::{Outcome, SessionId, Stage};

/// All session events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A stage finished and its checkpoint was persisted
    StageCompleted {
        session_id: SessionId,
        stage: Stage,
        step: u64,
        timestamp: DateTime<Utc>,
    },

    /// A stage raised; nothing was persisted for it
    StageFailed {
        session_id: SessionId,
        stage: Stage,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The session is suspended until answers arrive
    AwaitingAnswers {
        session_id: SessionId,
        questions: usize,
        timestamp: DateTime<Utc>,
    },

    /// The session reached a terminal stage
    Finished {
        session_id: SessionId,
        outcome: Outcome,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionEvent::StageCompleted { session_id, .. }
            | SessionEvent::StageFailed { session_id, .. }
            | SessionEvent::AwaitingAnswers { session_id, .. }
            | SessionEvent::Finished { session_id, .. } => session_id,
        }
    }
}

/// A broadcast-based event bus for session events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<SessionEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SessionEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(SessionEvent::StageCompleted {
            session_id: SessionId::from("s1"),
            stage: Stage::Gather,
            step: 2,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            SessionEvent::StageCompleted { stage, step, .. } => {
                assert_eq!(*stage, Stage::Gather);
                assert_eq!(*step, 2);
            }
            _ => panic!("Expected StageCompleted event"),
        }
        assert_eq!(event.session_id().as_str(), "s1");
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(SessionEvent::Finished {
            session_id: SessionId::from("s1"),
            outcome: Outcome::Mastered,
            timestamp: Utc::now(),
        });
    }
}
