//! Review rotation: when a card's next review date is set or moved.
//!
//! - A card joins rotation the first time its mastery reaches 5, scheduled as
//!   a new FSRS item.
//! - Review-mode answers reschedule cards already on the clock (or at 5) from
//!   their stored memory.
//! - Learn-mode answers below 5 leave the review date alone.

use chrono::{DateTime, Utc};

use crate::model::{Card, QuizMode, ReviewGrade, Verdict};
use crate::scheduler::{Scheduler, SchedulerError, elapsed_days};

/// Update `after` (the card as returned by the mastery model) with any review
/// schedule change implied by answering `before`.
///
/// # Errors
///
/// Returns `SchedulerError` if the retention is invalid or FSRS fails.
pub fn schedule_after_answer(
    before: &Card,
    after: Card,
    verdict: Verdict,
    mode: QuizMode,
    now: DateTime<Utc>,
    retention: f32,
) -> Result<Card, SchedulerError> {
    let on_clock = before.next_review_at().is_some() || before.is_completed();
    let reschedule = mode == QuizMode::Review && on_clock;
    let enters_rotation = after.is_completed() && before.memory().is_none();

    if !reschedule && !enters_rotation {
        return Ok(after);
    }

    let scheduler = Scheduler::try_with_retention(retention)?;
    let elapsed = before
        .last_reviewed_at()
        .map_or(0.0, |last| elapsed_days(last, now));
    let applied = scheduler.apply(
        before.memory(),
        ReviewGrade::from_verdict(verdict),
        now,
        elapsed,
    )?;

    Ok(after.with_review(applied.outcome.next_review, applied.memory, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastery::apply_answer;
    use crate::model::{CardId, DeckId, MasteryScore};
    use crate::scheduler::{DEFAULT_RETENTION, MemoryState};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn card_at(half_steps: u8) -> Card {
        Card::new(CardId::new(1), DeckId::new(1), "hund", "dog", fixed_now())
            .unwrap()
            .with_mastery(MasteryScore::from_half_steps(half_steps).unwrap(), half_steps > 0)
    }

    fn answer(card: &Card, verdict: Verdict, mode: QuizMode) -> Card {
        let after = apply_answer(card, verdict).card;
        schedule_after_answer(card, after, verdict, mode, fixed_now(), DEFAULT_RETENTION).unwrap()
    }

    #[test]
    fn learn_answers_below_five_do_not_schedule() {
        let card = answer(&card_at(4), Verdict::Correct, QuizMode::Learn);
        assert_eq!(card.next_review_at(), None);
        assert!(card.memory().is_none());
    }

    #[test]
    fn reaching_five_enters_rotation() {
        let now = fixed_now();
        let card = answer(&card_at(8), Verdict::Correct, QuizMode::Learn);

        assert!(card.is_completed());
        assert!(card.next_review_at().is_some_and(|at| at > now));
        assert_eq!(card.last_reviewed_at(), Some(now));
        assert!(card.memory().is_some());
    }

    #[test]
    fn review_mode_reschedules_cards_on_the_clock() {
        let now = fixed_now();
        let scheduled = card_at(10).with_review(
            now - Duration::days(1),
            MemoryState::new(3.0, 5.0),
            now - Duration::days(4),
        );

        let passed = answer(&scheduled, Verdict::Correct, QuizMode::Review);
        let failed = answer(&scheduled, Verdict::Incorrect, QuizMode::Review);

        let passed_at = passed.next_review_at().unwrap();
        let failed_at = failed.next_review_at().unwrap();
        assert!(passed_at > now);
        assert!(failed_at < passed_at);
        assert_eq!(failed.mastery(), MasteryScore::points(4));
    }

    #[test]
    fn learn_mode_leaves_an_existing_schedule_alone() {
        let now = fixed_now();
        let due = now - Duration::days(1);
        let scheduled = card_at(6).with_review(due, MemoryState::new(3.0, 5.0), now - Duration::days(4));

        let card = answer(&scheduled, Verdict::Correct, QuizMode::Learn);
        assert_eq!(card.next_review_at(), Some(due));
    }

    #[test]
    fn invalid_retention_is_reported() {
        let card = card_at(8);
        let after = apply_answer(&card, Verdict::Correct).card;
        let err = schedule_after_answer(&card, after, Verdict::Correct, QuizMode::Learn, fixed_now(), 0.0)
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRetention { .. }));
    }
}
