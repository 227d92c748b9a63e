//! Multiple-choice quiz generation.
//!
//! Each card becomes one question: its term is the prompt, its definition the
//! correct answer, and up to three other cards' definitions the distractors.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

use crate::model::{Card, OPTION_COUNT, QuizItem};

const DISTRACTORS: usize = OPTION_COUNT - 1;

/// Turn cards into quiz items, one per card, preserving order.
#[must_use]
pub fn generate_quiz(cards: &[Card]) -> Vec<QuizItem> {
    generate_quiz_with_rng(cards, &mut rand::rng())
}

/// [`generate_quiz`] with a caller-supplied random source.
pub fn generate_quiz_with_rng<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Vec<QuizItem> {
    generate_items_for(cards, cards, rng)
}

/// Build items for `targets`, drawing distractors from `pool`.
///
/// Resume uses this to regenerate only the unanswered cards while still
/// sampling wrong answers from the whole deck.
pub fn generate_items_for<R: Rng + ?Sized>(
    targets: &[Card],
    pool: &[Card],
    rng: &mut R,
) -> Vec<QuizItem> {
    targets
        .iter()
        .map(|card| build_item(card, pool, rng))
        .collect()
}

fn build_item<R: Rng + ?Sized>(card: &Card, pool: &[Card], rng: &mut R) -> QuizItem {
    let correct = card.definition();

    let mut seen = HashSet::new();
    let mut candidates: Vec<&str> = pool
        .iter()
        .filter(|other| other.id() != card.id())
        .map(Card::definition)
        .filter(|value| !value.is_empty() && *value != correct)
        .filter(|value| seen.insert(*value))
        .collect();
    candidates.shuffle(rng);

    let mut options: [String; OPTION_COUNT] = Default::default();
    for (slot, value) in options.iter_mut().zip(candidates.iter().take(DISTRACTORS)) {
        *slot = (*value).to_owned();
    }
    options[DISTRACTORS] = correct.to_owned();
    options.shuffle(rng);

    QuizItem::from_parts(card.id(), card.term().to_owned(), options, correct.to_owned())
}
