use chrono::{DateTime, Utc};

use crate::model::answer::Verdict;

//
// ─── REVIEW GRADE ─────────────────────────────────────────────────────────────
//

/// Four-level recall rating fed to the FSRS scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewGrade {
    /// Failed to recall. Shortest interval.
    Again,
    Hard,
    Good,
    /// Recalled instantly. Longest interval.
    Easy,
}

impl ReviewGrade {
    /// Grade for a single quiz answer: wrong is `Again`, half credit is
    /// `Hard`, full credit is `Good`.
    #[must_use]
    pub fn from_verdict(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Incorrect => Self::Again,
            Verdict::Partial => Self::Hard,
            Verdict::Correct => Self::Good,
        }
    }

    /// Grade for a whole session from its accuracy.
    ///
    /// `>= 90%` is `Easy`, `>= 70%` `Good`, `>= 50%` `Hard`, anything lower
    /// (including an empty session) `Again`.
    #[must_use]
    pub fn from_accuracy(correct: u32, total: u32) -> Self {
        if total == 0 {
            return Self::Again;
        }
        // percent without floats: correct * 100 / total
        let percent = u64::from(correct) * 100 / u64::from(total);
        match percent {
            90.. => Self::Easy,
            70..=89 => Self::Good,
            50..=69 => Self::Hard,
            _ => Self::Again,
        }
    }
}

//
// ─── REVIEW OUTCOME ──────────────────────────────────────────────────────────
//

/// Output from the FSRS scheduler for one grade.
///
/// - `next_review`: when the item is due again
/// - `stability`: memory stability (higher = longer retention)
/// - `difficulty`: item difficulty (0-10, higher = harder)
/// - `scheduled_days`: interval length in days
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub next_review: DateTime<Utc>,
    pub stability: f64,
    pub difficulty: f64,
    pub elapsed_days: f64,
    pub scheduled_days: f64,
}

impl ReviewOutcome {
    #[must_use]
    pub fn new(
        next_review: DateTime<Utc>,
        stability: f64,
        difficulty: f64,
        elapsed_days: f64,
        scheduled_days: f64,
    ) -> Self {
        Self {
            next_review,
            stability,
            difficulty,
            elapsed_days,
            scheduled_days,
        }
    }
}
