//! Completion events for gamification consumers.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use lingo_core::model::{CardId, DeckId, QuizMode, UserId};

/// Emitted once when a session's completion has been recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCompletedEvent {
    pub user_id: UserId,
    pub deck_id: DeckId,
    pub mode: QuizMode,
    /// Distinct cards answered, in first-answer order.
    pub card_ids: Vec<CardId>,
    pub correct_count: u32,
    pub total_count: u32,
}

#[derive(Debug, Error)]
#[error("event sink failed: {0}")]
pub struct EventSinkError(pub String);

/// Consumer of session events. Failures are logged and never affect the
/// session.
#[async_trait]
pub trait SessionEventSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `EventSinkError` when the consumer cannot accept the event.
    async fn session_completed(&self, event: &SessionCompletedEvent) -> Result<(), EventSinkError>;
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl SessionEventSink for TracingEventSink {
    async fn session_completed(&self, event: &SessionCompletedEvent) -> Result<(), EventSinkError> {
        tracing::info!(
            user_id = %event.user_id,
            deck_id = %event.deck_id,
            mode = %event.mode,
            cards = event.card_ids.len(),
            correct = event.correct_count,
            total = event.total_count,
            "session completed event"
        );
        Ok(())
    }
}
