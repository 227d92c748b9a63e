use chrono::{DateTime, Utc};
use std::sync::Arc;

use lingo_core::Clock;
use lingo_core::model::{
    Answer, DeckId, HistoryEntry, QuizMode, SessionProgressRecord, StudyOptions, UserId,
};
use lingo_core::selector::CardBreakdown;
use lingo_storage::repository::{
    CardRepository, HistoryRecorder, ProgressStore, Storage, StorageError,
};

use super::queries::SessionQueries;
use super::service::{AnswerSubmission, QuizSession, SessionStatus};
use crate::error::SessionError;
use crate::events::{SessionCompletedEvent, SessionEventSink};
use crate::settings::EngineSettings;

/// Completion data returned once a session is recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub entry_id: i64,
    pub next_quiz_date: DateTime<Utc>,
}

/// Result of answering through the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub answer: Answer,
    /// Set when this answer finished the session.
    pub completion: Option<Completion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Ready,
    /// The selection came back empty; show a "no cards" screen instead of a quiz.
    NoCardsAvailable,
}

/// How `start_session` found the deck.
#[derive(Debug, Clone)]
pub enum SessionStart {
    Fresh(QuizSession),
    Resumed(QuizSession),
    NoCardsAvailable,
}

impl SessionStart {
    #[must_use]
    pub fn into_session(self) -> Option<QuizSession> {
        match self {
            Self::Fresh(session) | Self::Resumed(session) => Some(session),
            Self::NoCardsAvailable => None,
        }
    }
}

/// Drives quiz sessions against the card store, progress store and history.
#[derive(Clone)]
pub struct SessionEngine {
    clock: Clock,
    settings: EngineSettings,
    cards: Arc<dyn CardRepository>,
    progress: Arc<dyn ProgressStore>,
    history: Arc<dyn HistoryRecorder>,
    events: Option<Arc<dyn SessionEventSink>>,
}

impl SessionEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        cards: Arc<dyn CardRepository>,
        progress: Arc<dyn ProgressStore>,
        history: Arc<dyn HistoryRecorder>,
    ) -> Self {
        Self {
            clock,
            settings: EngineSettings::default(),
            cards,
            progress,
            history,
            events: None,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.cards),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.history),
        )
    }

    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Notify `sink` whenever a session completes.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn SessionEventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// A `NotStarted` session; load it with [`SessionEngine::load_session`].
    #[must_use]
    pub fn open_session(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        mode: QuizMode,
        options: StudyOptions,
    ) -> QuizSession {
        QuizSession::new(user_id, deck_id, mode, options, self.settings.retention())
    }

    /// Fetch the deck snapshot, select and generate, then start the session.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the card fetch fails, or `AlreadyLoaded` if
    /// the session was loaded before.
    pub async fn load_session(&self, session: &mut QuizSession) -> Result<LoadOutcome, SessionError> {
        if session.status() != SessionStatus::NotStarted {
            return Err(SessionError::AlreadyLoaded);
        }
        let snapshot = self.cards.fetch_cards(session.deck_id()).await?;
        let now = self.clock.now();
        let Some(plan) = SessionQueries::plan_fresh(snapshot, session.options(), now) else {
            tracing::info!(
                user_id = %session.user_id(),
                deck_id = %session.deck_id(),
                card_type = %session.options().card_type(),
                "no cards available for session"
            );
            return Ok(LoadOutcome::NoCardsAvailable);
        };

        session.load(plan.cards, plan.items, now)?;
        tracing::info!(
            user_id = %session.user_id(),
            deck_id = %session.deck_id(),
            mode = %session.mode(),
            questions = session.items().len(),
            "session started"
        );
        Ok(LoadOutcome::Ready)
    }

    /// Start a session, resuming saved progress for (user, deck) when there is any.
    ///
    /// A saved record that cannot be decoded or no longer fits the deck is
    /// ignored with a warning and a fresh session starts; it is replaced when
    /// the learner pauses again or removed on completion.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on storage failures other than a corrupt record.
    pub async fn start_session(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        mode: QuizMode,
        options: StudyOptions,
    ) -> Result<SessionStart, SessionError> {
        match self.progress.load(user_id, deck_id).await {
            Ok(Some(record)) => {
                if let Some(session) = self.resume(user_id, deck_id, &record).await? {
                    return Ok(SessionStart::Resumed(session));
                }
            }
            Ok(None) => {}
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!(
                    user_id = %user_id,
                    deck_id = %deck_id,
                    reason = %reason,
                    "saved progress is unreadable, starting fresh"
                );
            }
            Err(err) => return Err(err.into()),
        }
        self.start_fresh_session(user_id, deck_id, mode, options).await
    }

    /// Start a session without looking at saved progress.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the card fetch fails.
    pub async fn start_fresh_session(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        mode: QuizMode,
        options: StudyOptions,
    ) -> Result<SessionStart, SessionError> {
        let mut session = self.open_session(user_id, deck_id, mode, options);
        match self.load_session(&mut session).await? {
            LoadOutcome::Ready => Ok(SessionStart::Fresh(session)),
            LoadOutcome::NoCardsAvailable => Ok(SessionStart::NoCardsAvailable),
        }
    }

    async fn resume(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        record: &SessionProgressRecord,
    ) -> Result<Option<QuizSession>, SessionError> {
        let snapshot = self.cards.fetch_cards(deck_id).await?;
        let plan = match SessionQueries::plan_resume(snapshot, record) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    deck_id = %deck_id,
                    error = %err,
                    "saved progress cannot be resumed, starting fresh"
                );
                return Ok(None);
            }
        };
        if plan.dropped > 0 {
            tracing::info!(
                deck_id = %deck_id,
                dropped = plan.dropped,
                "skipping deleted cards from saved progress"
            );
        }

        let mut session = QuizSession::new(
            user_id,
            deck_id,
            record.mode,
            record.options.clone(),
            self.settings.retention(),
        );
        session.load_resumed(
            plan.cards,
            plan.items,
            record.answers.clone(),
            record.score,
            self.clock.now(),
        )?;
        tracing::info!(
            user_id = %user_id,
            deck_id = %deck_id,
            answered = record.answers.len(),
            remaining = session.items().len(),
            "session resumed"
        );
        Ok(Some(session))
    }

    /// Record an answer and finish the session when it was the last one.
    ///
    /// Learning-flag flips are written immediately; a failed write only logs
    /// a warning since the batch at completion carries the same state.
    ///
    /// # Errors
    ///
    /// Returns the session's rejection for an invalid answer. If the final
    /// answer was accepted but completion could not be recorded, the error is
    /// returned and [`SessionEngine::finalize`] can be retried.
    pub async fn submit_answer(
        &self,
        session: &mut QuizSession,
        submission: AnswerSubmission,
    ) -> Result<AnswerOutcome, SessionError> {
        let submitted = session.submit_answer(submission, self.clock.now())?;

        tracing::debug!(
            deck_id = %session.deck_id(),
            card_id = %submitted.answer.card_id,
            question = submitted.answer.question_number,
            correct = submitted.answer.correct,
            partial = submitted.answer.partial,
            mastery = submitted.answer.resulting_mastery.value(),
            "answer recorded"
        );

        if let Some(change) = submitted.learning_change {
            if let Err(err) = self
                .cards
                .set_card_learning_flag(session.deck_id(), change.card_id, change.learning)
                .await
            {
                tracing::warn!(
                    card_id = %change.card_id,
                    learning = change.learning,
                    error = %err,
                    "failed to write learning flag"
                );
            }
        }

        let completion = if submitted.is_last {
            Some(self.finalize(session).await?)
        } else {
            None
        };

        Ok(AnswerOutcome {
            answer: submitted.answer,
            completion,
        })
    }

    /// Persist changed cards, append history and clear saved progress.
    ///
    /// Calling it again on a completed session returns the same completion.
    ///
    /// # Errors
    ///
    /// Returns `Incomplete` while questions remain, the status error for
    /// sessions that are not running, or `Persistence` if the card batch or
    /// the history append fails. The session then stays awaiting
    /// finalization and the call can be retried.
    pub async fn finalize(&self, session: &mut QuizSession) -> Result<Completion, SessionError> {
        if let Some(receipt) = session.receipt() {
            return Ok(Completion {
                entry_id: receipt.entry_id,
                next_quiz_date: receipt.next_quiz_date,
            });
        }
        match session.status() {
            SessionStatus::NotStarted => return Err(SessionError::NotLoadedYet),
            SessionStatus::Paused => return Err(SessionError::Paused),
            SessionStatus::Completed => return Err(SessionError::AlreadyCompleted),
            SessionStatus::InProgress if !session.is_awaiting_finalization() => {
                return Err(SessionError::Incomplete);
            }
            SessionStatus::InProgress => {}
        }

        let (user_id, deck_id) = (session.user_id(), session.deck_id());
        self.cards
            .persist_card_batch(deck_id, &session.staged_cards())
            .await?;
        let receipt = self
            .history
            .append(user_id, deck_id, session.mode(), &session.history_details())
            .await?;
        session.mark_completed(receipt)?;

        if let Err(err) = self.progress.delete(user_id, deck_id).await {
            tracing::warn!(
                user_id = %user_id,
                deck_id = %deck_id,
                error = %err,
                "failed to clear saved progress"
            );
        }

        let event = SessionCompletedEvent {
            user_id,
            deck_id,
            mode: session.mode(),
            card_ids: session.answered_card_ids(),
            correct_count: session.score(),
            total_count: u32::try_from(session.answers().len()).unwrap_or(u32::MAX),
        };
        if let Some(sink) = &self.events {
            if let Err(err) = sink.session_completed(&event).await {
                tracing::warn!(deck_id = %deck_id, error = %err, "completion event was not delivered");
            }
        }

        tracing::info!(
            user_id = %user_id,
            deck_id = %deck_id,
            entry_id = receipt.entry_id,
            score = session.score(),
            total = event.total_count,
            next_quiz = %receipt.next_quiz_date,
            "session completed"
        );
        Ok(Completion {
            entry_id: receipt.entry_id,
            next_quiz_date: receipt.next_quiz_date,
        })
    }

    /// Save card progress and the session position, then pause.
    ///
    /// # Errors
    ///
    /// Returns the status error when the session cannot pause (including
    /// `AwaitingFinalization`), or `Persistence` if a write fails. The
    /// session stays in progress after a failed write.
    pub async fn save_and_exit(&self, session: &mut QuizSession) -> Result<(), SessionError> {
        let record = session.progress_record(self.clock.now())?;
        let (user_id, deck_id) = (session.user_id(), session.deck_id());

        self.cards
            .persist_card_batch(deck_id, &session.staged_cards())
            .await?;
        self.progress.save(user_id, deck_id, &record).await?;
        session.mark_paused()?;

        tracing::info!(
            user_id = %user_id,
            deck_id = %deck_id,
            answered = record.answers.len(),
            next_question = record.next_question_number(),
            "session paused"
        );
        Ok(())
    }

    /// Forget saved progress so the next start is fresh.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` on storage failures.
    pub async fn discard_progress(&self, user_id: UserId, deck_id: DeckId) -> Result<(), SessionError> {
        self.progress.delete(user_id, deck_id).await?;
        Ok(())
    }

    /// How many cards each selection type would match right now under the
    /// completed-card gate in `options`.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the card fetch fails.
    pub async fn deck_overview(
        &self,
        deck_id: DeckId,
        options: &StudyOptions,
    ) -> Result<CardBreakdown, SessionError> {
        let cards = self.cards.fetch_cards(deck_id).await?;
        Ok(CardBreakdown::from_cards(&cards, options, self.clock.now()))
    }

    /// # Errors
    ///
    /// Returns `Persistence` on storage failures.
    pub async fn recent_history(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, SessionError> {
        Ok(self.history.list_entries(user_id, deck_id, limit).await?)
    }
}
