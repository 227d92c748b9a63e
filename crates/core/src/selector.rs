//! Card selection: which cards a session quizzes on, in which order.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Card, CardTypeToLearn, StudyOptions};

/// Pick the bounded, ordered working set for a session.
#[must_use]
pub fn select_cards(cards: &[Card], options: &StudyOptions, now: DateTime<Utc>) -> Vec<Card> {
    select_cards_with_rng(cards, options, now, &mut rand::rng())
}

/// [`select_cards`] with a caller-supplied random source.
pub fn select_cards_with_rng<R: Rng + ?Sized>(
    cards: &[Card],
    options: &StudyOptions,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<Card> {
    let mut selected = filter_cards(cards, options, now);
    if options.shuffle_cards() {
        shuffle_selection(&mut selected, rng);
    }
    selected.truncate(usize::try_from(options.cards_to_learn()).unwrap_or(usize::MAX));
    selected
}

/// Gate, filter and order cards without shuffling or truncating.
#[must_use]
pub fn filter_cards(cards: &[Card], options: &StudyOptions, now: DateTime<Utc>) -> Vec<Card> {
    let kind = options.card_type();
    let mut filtered: Vec<Card> = cards
        .iter()
        .filter(|card| options.include_completed_cards() || !card.is_completed())
        .filter(|card| matches_type(card, kind, now))
        .cloned()
        .collect();

    match kind {
        // undated cards are never due; they sort last
        CardTypeToLearn::DueForReview => {
            filtered.sort_by_key(|card| (card.next_review_at().is_none(), card.next_review_at()));
        }
        _ => filtered.sort_by_key(|card| (card.mastery(), !card.is_learning())),
    }
    filtered
}

/// Shuffle replaces the priority order entirely.
fn shuffle_selection<R: Rng + ?Sized>(cards: &mut [Card], rng: &mut R) {
    cards.shuffle(rng);
}

fn matches_type(card: &Card, kind: CardTypeToLearn, now: DateTime<Utc>) -> bool {
    match kind {
        CardTypeToLearn::All => true,
        CardTypeToLearn::NotStudied => card.is_not_studied(),
        CardTypeToLearn::Learning => card.is_in_learning_band(),
        CardTypeToLearn::Completed => card.is_completed(),
        CardTypeToLearn::DueForReview => card.is_due(now),
    }
}

/// Per-bucket card counts for a deck, as each selection type would match
/// them under the given options' completed-card gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardBreakdown {
    pub total: usize,
    pub not_studied: usize,
    pub learning: usize,
    pub completed: usize,
    pub due: usize,
}

impl CardBreakdown {
    #[must_use]
    pub fn from_cards(cards: &[Card], options: &StudyOptions, now: DateTime<Utc>) -> Self {
        let gated = cards
            .iter()
            .filter(|card| options.include_completed_cards() || !card.is_completed());
        gated.fold(Self::default(), |mut acc, card| {
            acc.total += 1;
            acc.not_studied += usize::from(card.is_not_studied());
            acc.learning += usize::from(card.is_in_learning_band());
            acc.completed += usize::from(card.is_completed());
            acc.due += usize::from(card.is_due(now));
            acc
        })
    }

    #[must_use]
    pub fn count_for(&self, kind: CardTypeToLearn) -> usize {
        match kind {
            CardTypeToLearn::All => self.total,
            CardTypeToLearn::NotStudied => self.not_studied,
            CardTypeToLearn::Learning => self.learning,
            CardTypeToLearn::Completed => self.completed,
            CardTypeToLearn::DueForReview => self.due,
        }
    }
}
