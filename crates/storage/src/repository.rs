use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lingo_core::Clock;
use lingo_core::model::{
    Card, CardId, Deck, DeckId, HistoryEntry, HistoryReceipt, QuizDetail, QuizMode,
    SessionProgressRecord, UserId,
};
use lingo_core::scheduler::MemoryState;
use lingo_core::spacing::{DeckSchedule, DeckSpacing};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("scheduling error: {0}")]
    Scheduling(String),
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Persist or update a deck.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError>;

    /// All decks ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_decks(&self) -> Result<Vec<Deck>, StorageError>;
}

/// Card source and sinks used by study sessions.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Persist or update a card, including its study state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the card cannot be stored.
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError>;

    /// Every card of a deck, ordered by ID. The snapshot a session studies.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn fetch_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError>;

    /// Write the study state of several cards at once.
    ///
    /// Cards deleted since the session started are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a card belongs to another deck;
    /// nothing is written in that case.
    async fn persist_card_batch(&self, deck_id: DeckId, cards: &[Card])
    -> Result<(), StorageError>;

    /// Durably record a learning-flag flip.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card is missing and
    /// `StorageError::Conflict` if the flag would be set on a mastered card.
    async fn set_card_learning_flag(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        learning: bool,
    ) -> Result<(), StorageError>;
}

/// One saved in-flight session per (user, deck).
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Save a record, replacing any earlier one for the same key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or encoding failures.
    async fn save(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        record: &SessionProgressRecord,
    ) -> Result<(), StorageError>;

    /// Load the saved record, `None` when there is nothing to resume.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the stored record cannot be
    /// decoded, other variants on backend failures.
    async fn load(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<SessionProgressRecord>, StorageError>;

    /// Remove the saved record. Succeeds when there is none.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete(&self, user_id: UserId, deck_id: DeckId) -> Result<(), StorageError>;
}

/// Append-only session history with deck spacing.
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Record a finished session and compute the deck's next quiz date.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Scheduling` if spacing fails, other variants on
    /// backend failures.
    async fn append(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        quiz_type: QuizMode,
        details: &[QuizDetail],
    ) -> Result<HistoryReceipt, StorageError>;

    /// Most recent entries first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_entries(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, StorageError>;
}

//
// ─── SHARED HELPERS ────────────────────────────────────────────────────────────
//

/// Correct and total counts for a detail list.
pub(crate) fn tally(details: &[QuizDetail]) -> Result<(u32, u32), StorageError> {
    let total = u32::try_from(details.len())
        .map_err(|_| StorageError::Serialization("too many quiz details".into()))?;
    let correct = u32::try_from(details.iter().filter(|d| d.correct).count())
        .map_err(|_| StorageError::Serialization("too many quiz details".into()))?;
    Ok((correct, total))
}

pub(crate) fn schedule_deck(
    spacing: &DeckSpacing,
    previous: Option<(&MemoryState, DateTime<Utc>)>,
    quiz_type: QuizMode,
    correct: u32,
    total: u32,
    now: DateTime<Utc>,
) -> Result<DeckSchedule, StorageError> {
    spacing
        .next_quiz(previous, quiz_type, correct, total, now)
        .map_err(|e| StorageError::Scheduling(e.to_string()))
}

/// Copy of `card` with a different learning flag.
pub(crate) fn card_with_learning(card: &Card, learning: bool) -> Result<Card, StorageError> {
    Card::from_persisted(
        card.id(),
        card.deck_id(),
        card.term().to_owned(),
        card.definition().to_owned(),
        card.mastery(),
        learning,
        card.next_review_at(),
        card.last_reviewed_at(),
        card.memory().cloned(),
        card.created_at(),
    )
    .map_err(|_| StorageError::Conflict)
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

type ProgressKey = (UserId, DeckId);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    decks: Arc<Mutex<BTreeMap<DeckId, Deck>>>,
    cards: Arc<Mutex<BTreeMap<(DeckId, CardId), Card>>>,
    progress: Arc<Mutex<HashMap<ProgressKey, SessionProgressRecord>>>,
    history: Arc<Mutex<Vec<HistoryEntry>>>,
    clock: Clock,
    spacing: DeckSpacing,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `clock` for history timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_spacing(mut self, spacing: DeckSpacing) -> Self {
        self.spacing = spacing;
        self
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn upsert_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut guard = self.decks.lock().map_err(poisoned)?;
        guard.insert(deck.id(), deck.clone());
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Deck, StorageError> {
        let guard = self.decks.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_decks(&self) -> Result<Vec<Deck>, StorageError> {
        let guard = self.decks.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn upsert_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut guard = self.cards.lock().map_err(poisoned)?;
        guard.insert((card.deck_id(), card.id()), card.clone());
        Ok(())
    }

    async fn fetch_cards(&self, deck_id: DeckId) -> Result<Vec<Card>, StorageError> {
        let guard = self.cards.lock().map_err(poisoned)?;
        Ok(guard
            .range((deck_id, CardId::new(0))..=(deck_id, CardId::new(u64::MAX)))
            .map(|(_, card)| card.clone())
            .collect())
    }

    async fn persist_card_batch(
        &self,
        deck_id: DeckId,
        cards: &[Card],
    ) -> Result<(), StorageError> {
        if cards.iter().any(|card| card.deck_id() != deck_id) {
            return Err(StorageError::Conflict);
        }

        let mut guard = self.cards.lock().map_err(poisoned)?;
        for card in cards {
            if let Some(stored) = guard.get_mut(&(deck_id, card.id())) {
                *stored = card.clone();
            }
        }
        Ok(())
    }

    async fn set_card_learning_flag(
        &self,
        deck_id: DeckId,
        card_id: CardId,
        learning: bool,
    ) -> Result<(), StorageError> {
        let mut guard = self.cards.lock().map_err(poisoned)?;
        let stored = guard
            .get_mut(&(deck_id, card_id))
            .ok_or(StorageError::NotFound)?;
        *stored = card_with_learning(stored, learning)?;
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for InMemoryRepository {
    async fn save(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        record: &SessionProgressRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert((user_id, deck_id), record.clone());
        Ok(())
    }

    async fn load(
        &self,
        user_id: UserId,
        deck_id: DeckId,
    ) -> Result<Option<SessionProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id, deck_id)).cloned())
    }

    async fn delete(&self, user_id: UserId, deck_id: DeckId) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.remove(&(user_id, deck_id));
        Ok(())
    }
}

#[async_trait]
impl HistoryRecorder for InMemoryRepository {
    async fn append(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        quiz_type: QuizMode,
        details: &[QuizDetail],
    ) -> Result<HistoryReceipt, StorageError> {
        let now = self.clock.now();
        let (correct, total) = tally(details)?;

        let mut guard = self.history.lock().map_err(poisoned)?;
        let previous = guard
            .iter()
            .rev()
            .find(|e| e.user_id == user_id && e.deck_id == deck_id)
            .map(|e| (&e.memory, e.created_at));
        let schedule = schedule_deck(&self.spacing, previous, quiz_type, correct, total, now)?;

        let entry_id = i64::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("history id overflow".into()))?;
        guard.push(HistoryEntry {
            id: entry_id,
            user_id,
            deck_id,
            cards_studied: total,
            correct_answers: correct,
            quiz_type,
            details: details.to_vec(),
            next_quiz_date: schedule.next_quiz_at,
            created_at: now,
            memory: schedule.memory,
        });

        Ok(HistoryReceipt {
            entry_id,
            next_quiz_date: schedule.next_quiz_at,
        })
    }

    async fn list_entries(
        &self,
        user_id: UserId,
        deck_id: DeckId,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let guard = self.history.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id && e.deck_id == deck_id)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

//
// ─── AGGREGATE ─────────────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub decks: Arc<dyn DeckRepository>,
    pub cards: Arc<dyn CardRepository>,
    pub progress: Arc<dyn ProgressStore>,
    pub history: Arc<dyn HistoryRecorder>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one backend across every contract.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: DeckRepository + CardRepository + ProgressStore + HistoryRecorder + Clone + 'static,
    {
        let decks: Arc<dyn DeckRepository> = Arc::new(repo.clone());
        let cards: Arc<dyn CardRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressStore> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryRecorder> = Arc::new(repo);
        Self {
            decks,
            cards,
            progress,
            history,
        }
    }
}
