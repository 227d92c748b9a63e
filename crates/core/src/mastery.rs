//! Per-answer mastery rules.
//!
//! Scores move in half steps: a full answer is worth two, a partial one,
//! and a wrong answer costs two. The score saturates at both ends.

use crate::model::{Card, Verdict};

const CORRECT_STEP: u8 = 2;
const PARTIAL_STEP: u8 = 1;
const PENALTY_STEP: u8 = 2;

/// A card after one answer, plus whether its learning flag flipped.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteryChange {
    pub card: Card,
    pub learning_changed: bool,
}

/// Apply one answer to a card, returning the updated card.
///
/// The learning flag turns on the first time an untouched card (score 0,
/// not learning) is answered, and turns off once the score reaches 5.
#[must_use]
pub fn apply_answer(card: &Card, verdict: Verdict) -> MasteryChange {
    let before = card.mastery();
    let after = match verdict {
        Verdict::Correct => before.raised(CORRECT_STEP),
        Verdict::Partial => before.raised(PARTIAL_STEP),
        Verdict::Incorrect => before.lowered(PENALTY_STEP),
    };

    let learning = if after.is_mastered() {
        false
    } else if before.is_zero() && !card.is_learning() {
        true
    } else {
        card.is_learning()
    };

    let learning_changed = learning != card.is_learning();
    MasteryChange {
        card: card.clone().with_mastery(after, learning),
        learning_changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardId, DeckId, MasteryScore};
    use crate::time::fixed_now;
    use proptest::prelude::*;

    fn card_at(points_x2: u8, learning: bool) -> Card {
        Card::new(CardId::new(1), DeckId::new(1), "hund", "dog", fixed_now())
            .unwrap()
            .with_mastery(MasteryScore::from_half_steps(points_x2).unwrap(), learning)
    }

    #[test]
    fn full_answer_at_four_completes_the_card() {
        let change = apply_answer(&card_at(8, true), Verdict::Correct);
        assert_eq!(change.card.mastery(), MasteryScore::MAX);
        assert!(!change.card.is_learning());
        assert!(change.learning_changed);
    }

    #[test]
    fn wrong_answer_at_two_drops_to_one() {
        let change = apply_answer(&card_at(4, true), Verdict::Incorrect);
        assert_eq!(change.card.mastery(), MasteryScore::points(1));
        assert!(change.card.is_learning());
        assert!(!change.learning_changed);
    }

    #[test]
    fn first_touch_starts_learning_even_when_wrong() {
        let change = apply_answer(&card_at(0, false), Verdict::Incorrect);
        assert_eq!(change.card.mastery(), MasteryScore::ZERO);
        assert!(change.card.is_learning());
        assert!(change.learning_changed);
    }

    #[test]
    fn partial_credit_is_half_a_point() {
        let change = apply_answer(&card_at(3, true), Verdict::Partial);
        assert!((change.card.mastery().value() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_is_clamped_at_both_ends() {
        let top = apply_answer(&card_at(10, false), Verdict::Correct);
        assert_eq!(top.card.mastery(), MasteryScore::MAX);
        assert!(!top.learning_changed);

        let bottom = apply_answer(&card_at(1, true), Verdict::Incorrect);
        assert_eq!(bottom.card.mastery(), MasteryScore::ZERO);
    }

    #[test]
    fn mastered_card_answered_wrong_keeps_flag_off() {
        let change = apply_answer(&card_at(10, false), Verdict::Incorrect);
        assert_eq!(change.card.mastery(), MasteryScore::points(4));
        assert!(!change.card.is_learning());
    }

    fn verdict() -> impl Strategy<Value = Verdict> {
        prop_oneof![
            Just(Verdict::Correct),
            Just(Verdict::Partial),
            Just(Verdict::Incorrect),
        ]
    }

    proptest! {
        #[test]
        fn mastery_stays_in_bounds_and_flag_consistent(
            start in 0u8..=10,
            learning in any::<bool>(),
            verdicts in prop::collection::vec(verdict(), 0..40),
        ) {
            let mut card = card_at(start, learning);
            for v in verdicts {
                let change = apply_answer(&card, v);
                prop_assert_eq!(change.learning_changed, change.card.is_learning() != card.is_learning());
                card = change.card;

                prop_assert!(card.mastery() <= MasteryScore::MAX);
                prop_assert!((0.0..=5.0).contains(&card.mastery().value()));
                prop_assert!(!(card.is_learning() && card.mastery().is_mastered()));
            }
        }
    }
}
