use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{CardId, DeckId};
use crate::model::score::{InvalidMasteryScore, MasteryScore};
use crate::scheduler::MemoryState;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card term cannot be empty")]
    EmptyTerm,

    #[error("card definition cannot be empty")]
    EmptyDefinition,

    #[error(transparent)]
    InvalidMastery(#[from] InvalidMasteryScore),

    #[error("invalid persisted card state: {0}")]
    InvalidPersistedState(String),
}

//
// ─── CARD ──────────────────────────────────────────────────────────────────────
//

/// A single term/definition flashcard with its study state.
///
/// Study state (`mastery`, `learning`, `next_review_at`) only changes through
/// the mastery model and review rotation, which return new values instead of
/// mutating shared cards.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    id: CardId,
    deck_id: DeckId,
    term: String,
    definition: String,
    mastery: MasteryScore,
    learning: bool,
    next_review_at: Option<DateTime<Utc>>,
    last_reviewed_at: Option<DateTime<Utc>>,
    memory: Option<MemoryState>,
    created_at: DateTime<Utc>,
}

impl Card {
    /// Create a brand-new, untouched card.
    ///
    /// # Errors
    ///
    /// Returns `CardError::EmptyTerm` or `CardError::EmptyDefinition` when either
    /// side is blank.
    pub fn new(
        id: CardId,
        deck_id: DeckId,
        term: impl Into<String>,
        definition: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        let term = term.into();
        let definition = definition.into();
        if term.trim().is_empty() {
            return Err(CardError::EmptyTerm);
        }
        if definition.trim().is_empty() {
            return Err(CardError::EmptyDefinition);
        }

        Ok(Self {
            id,
            deck_id,
            term,
            definition,
            mastery: MasteryScore::ZERO,
            learning: false,
            next_review_at: None,
            last_reviewed_at: None,
            memory: None,
            created_at,
        })
    }

    /// Rehydrate a card from storage, checking the study-state invariants.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if texts are blank or the learning flag is set on a
    /// mastered card.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: CardId,
        deck_id: DeckId,
        term: String,
        definition: String,
        mastery: MasteryScore,
        learning: bool,
        next_review_at: Option<DateTime<Utc>>,
        last_reviewed_at: Option<DateTime<Utc>>,
        memory: Option<MemoryState>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        if learning && mastery.is_mastered() {
            return Err(CardError::InvalidPersistedState(format!(
                "card {id} is flagged learning at mastery {mastery}"
            )));
        }

        let mut card = Self::new(id, deck_id, term, definition, created_at)?;
        card.mastery = mastery;
        card.learning = learning;
        card.next_review_at = next_review_at;
        card.last_reviewed_at = last_reviewed_at;
        card.memory = memory;
        Ok(card)
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn definition(&self) -> &str {
        &self.definition
    }

    #[must_use]
    pub fn mastery(&self) -> MasteryScore {
        self.mastery
    }

    #[must_use]
    pub fn is_learning(&self) -> bool {
        self.learning
    }

    #[must_use]
    pub fn next_review_at(&self) -> Option<DateTime<Utc>> {
        self.next_review_at
    }

    #[must_use]
    pub fn last_reviewed_at(&self) -> Option<DateTime<Utc>> {
        self.last_reviewed_at
    }

    #[must_use]
    pub fn memory(&self) -> Option<&MemoryState> {
        self.memory.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Mastery is exactly zero.
    #[must_use]
    pub fn is_not_studied(&self) -> bool {
        self.mastery.is_zero()
    }

    /// Mastery in `[1, 5)`.
    #[must_use]
    pub fn is_in_learning_band(&self) -> bool {
        self.mastery >= MasteryScore::points(1) && !self.mastery.is_mastered()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.mastery.is_mastered()
    }

    /// On the review clock and the review date has passed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_review_at.is_some_and(|at| at <= now)
    }

    pub(crate) fn with_mastery(mut self, mastery: MasteryScore, learning: bool) -> Self {
        self.mastery = mastery;
        self.learning = learning && !mastery.is_mastered();
        self
    }

    pub(crate) fn with_review(
        mut self,
        next_review_at: DateTime<Utc>,
        memory: MemoryState,
        reviewed_at: DateTime<Utc>,
    ) -> Self {
        self.next_review_at = Some(next_review_at);
        self.memory = Some(memory);
        self.last_reviewed_at = Some(reviewed_at);
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn card() -> Card {
        Card::new(CardId::new(1), DeckId::new(1), "hund", "dog", fixed_now()).unwrap()
    }

    #[test]
    fn new_card_starts_untouched() {
        let card = card();
        assert!(card.is_not_studied());
        assert!(!card.is_learning());
        assert_eq!(card.next_review_at(), None);
        assert!(card.memory().is_none());
    }

    #[test]
    fn blank_texts_are_rejected() {
        let err = Card::new(CardId::new(1), DeckId::new(1), "  ", "dog", fixed_now()).unwrap_err();
        assert_eq!(err, CardError::EmptyTerm);

        let err = Card::new(CardId::new(1), DeckId::new(1), "hund", "", fixed_now()).unwrap_err();
        assert_eq!(err, CardError::EmptyDefinition);
    }

    #[test]
    fn persisted_learning_flag_on_mastered_card_is_rejected() {
        let err = Card::from_persisted(
            CardId::new(3),
            DeckId::new(1),
            "katt".into(),
            "cat".into(),
            MasteryScore::MAX,
            true,
            None,
            None,
            None,
            fixed_now(),
        )
        .unwrap_err();

        assert!(matches!(err, CardError::InvalidPersistedState(_)));
    }

    #[test]
    fn bands_follow_mastery() {
        let half = card().with_mastery(MasteryScore::from_half_steps(1).unwrap(), true);
        assert!(!half.is_not_studied());
        assert!(!half.is_in_learning_band());

        let three = card().with_mastery(MasteryScore::points(3), true);
        assert!(three.is_in_learning_band());
        assert!(!three.is_completed());

        let done = card().with_mastery(MasteryScore::MAX, true);
        assert!(done.is_completed());
        assert!(!done.is_learning());
    }

    #[test]
    fn due_requires_a_past_review_date() {
        let now = fixed_now();
        let memory = MemoryState::new(2.0, 5.0);

        assert!(!card().is_due(now));

        let due = card().with_review(now - Duration::hours(1), memory.clone(), now);
        assert!(due.is_due(now));

        let later = card().with_review(now + Duration::days(1), memory, now);
        assert!(!later.is_due(now));
    }
}
