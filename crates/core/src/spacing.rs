//! Deck-level spacing: when a deck should be quizzed again after a session.

use chrono::{DateTime, Utc};

use crate::model::{QuizMode, ReviewGrade};
use crate::scheduler::{DEFAULT_RETENTION, MemoryState, Scheduler, SchedulerError, elapsed_days};

/// Next quiz date and the deck memory to store with the history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSchedule {
    pub next_quiz_at: DateTime<Utc>,
    pub grade: ReviewGrade,
    pub memory: MemoryState,
}

/// Turns a finished session into the deck's next quiz date.
///
/// Accuracy is graded like a single FSRS review of the whole deck. Learn
/// sessions never earn `Easy`, since the material is still new.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckSpacing {
    retention: f32,
}

impl Default for DeckSpacing {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
        }
    }
}

impl DeckSpacing {
    #[must_use]
    pub fn new(retention: f32) -> Self {
        Self { retention }
    }

    #[must_use]
    pub fn retention(&self) -> f32 {
        self.retention
    }

    /// Schedule the deck given its previous memory and when that was recorded.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if the retention is invalid or FSRS fails.
    pub fn next_quiz(
        &self,
        previous: Option<(&MemoryState, DateTime<Utc>)>,
        mode: QuizMode,
        correct: u32,
        total: u32,
        now: DateTime<Utc>,
    ) -> Result<DeckSchedule, SchedulerError> {
        let mut grade = ReviewGrade::from_accuracy(correct, total);
        if mode == QuizMode::Learn && grade == ReviewGrade::Easy {
            grade = ReviewGrade::Good;
        }

        let scheduler = Scheduler::try_with_retention(self.retention)?;
        let (memory, elapsed) = match previous {
            Some((memory, at)) => (Some(memory), elapsed_days(at, now)),
            None => (None, 0.0),
        };
        let applied = scheduler.apply(memory, grade, now, elapsed)?;

        Ok(DeckSchedule {
            next_quiz_at: applied.outcome.next_review,
            grade,
            memory: applied.memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn first_session_is_scheduled_in_the_future() {
        let now = fixed_now();
        let schedule = DeckSpacing::default()
            .next_quiz(None, QuizMode::Review, 9, 10, now)
            .unwrap();

        assert_eq!(schedule.grade, ReviewGrade::Easy);
        assert!(schedule.next_quiz_at >= now + Duration::days(1));
    }

    #[test]
    fn learn_sessions_cap_at_good() {
        let schedule = DeckSpacing::default()
            .next_quiz(None, QuizMode::Learn, 10, 10, fixed_now())
            .unwrap();
        assert_eq!(schedule.grade, ReviewGrade::Good);
    }

    #[test]
    fn poor_accuracy_comes_back_sooner() {
        let now = fixed_now();
        let memory = MemoryState::new(5.0, 5.0);
        let previous = Some((&memory, now - Duration::days(5)));
        let spacing = DeckSpacing::default();

        let good = spacing.next_quiz(previous, QuizMode::Review, 8, 10, now).unwrap();
        let bad = spacing.next_quiz(previous, QuizMode::Review, 2, 10, now).unwrap();

        assert_eq!(bad.grade, ReviewGrade::Again);
        assert!(bad.next_quiz_at < good.next_quiz_at);
    }

    #[test]
    fn invalid_retention_fails() {
        let err = DeckSpacing::new(2.0)
            .next_quiz(None, QuizMode::Learn, 1, 1, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRetention { .. }));
    }
}
