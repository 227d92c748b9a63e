use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ReviewGrade, ReviewOutcome};

/// Desired recall probability used when none is configured.
pub const DEFAULT_RETENTION: f32 = 0.9;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("FSRS scheduling failed: {0}")]
    FsrsError(String),
    #[error("optimal retention must be in (0, 1], got {provided}")]
    InvalidRetention { provided: f32 },
    #[error("elapsed days must be non-negative and finite, got {provided}")]
    InvalidElapsedDays { provided: f64 },
}

//
// ─── MEMORY STATE ──────────────────────────────────────────────────────────────
//

/// Serializable FSRS memory state.
///
/// Cards keep one to place themselves on the review clock; history entries
/// keep one per deck for the spacing policy.
///
/// # Examples
///
/// ```
/// # use lingo_core::scheduler::MemoryState;
/// let state = MemoryState::new(5.0, 3.5);
/// assert_eq!(state.stability, 5.0);
/// assert_eq!(state.difficulty, 3.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub stability: f64,
    pub difficulty: f64,
}

impl MemoryState {
    #[must_use]
    pub fn new(stability: f64, difficulty: f64) -> Self {
        Self {
            stability,
            difficulty,
        }
    }

    #[must_use]
    pub fn from_outcome(outcome: &ReviewOutcome) -> Self {
        Self {
            stability: outcome.stability,
            difficulty: outcome.difficulty,
        }
    }
}

//
// ─── SCHEDULED STATES ──────────────────────────────────────────────────────────
//

/// All four possible next states for one review. Pick one with `select`.
#[derive(Debug, Clone)]
pub struct ScheduledStates {
    pub again: ReviewOutcome,
    pub hard: ReviewOutcome,
    pub good: ReviewOutcome,
    pub easy: ReviewOutcome,
}

impl ScheduledStates {
    #[must_use]
    pub fn select(&self, grade: ReviewGrade) -> &ReviewOutcome {
        match grade {
            ReviewGrade::Again => &self.again,
            ReviewGrade::Hard => &self.hard,
            ReviewGrade::Good => &self.good,
            ReviewGrade::Easy => &self.easy,
        }
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// FSRS-based interval calculator shared by card rotation and deck spacing.
///
/// # Examples
///
/// ```
/// # use lingo_core::scheduler::Scheduler;
/// # use lingo_core::model::ReviewGrade;
/// let scheduler = Scheduler::new();
/// let now = chrono::Utc::now();
/// let applied = scheduler.apply(None, ReviewGrade::Good, now, 0.0)?;
///
/// assert!(applied.outcome.next_review > now);
/// # Ok::<(), lingo_core::scheduler::SchedulerError>(())
/// ```
pub struct Scheduler {
    fsrs: fsrs::FSRS,
    optimal_retention: f32,
}

/// Selected schedule and updated memory for one graded review.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedReview {
    pub grade: ReviewGrade,
    pub outcome: ReviewOutcome,
    pub memory: MemoryState,
}

impl Scheduler {
    /// Create scheduler with default parameters and 0.9 retention.
    #[must_use]
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    /// Create scheduler with custom desired retention without panicking.
    ///
    /// # Errors
    ///
    /// - `InvalidRetention` if `optimal_retention` is not in `(0, 1]`
    /// - `FsrsError` if FSRS initialization fails
    pub fn try_with_retention(optimal_retention: f32) -> Result<Self, SchedulerError> {
        if !(0.0..=1.0).contains(&optimal_retention) || optimal_retention == 0.0 {
            return Err(SchedulerError::InvalidRetention {
                provided: optimal_retention,
            });
        }

        let fsrs = fsrs::FSRS::new(Some(&[]))
            .map_err(|e| SchedulerError::FsrsError(e.to_string()))?;

        Ok(Self {
            fsrs,
            optimal_retention,
        })
    }

    /// Create scheduler with custom desired retention.
    ///
    /// # Panics
    ///
    /// Panics if FSRS initialization fails (should not happen with default parameters).
    #[must_use]
    pub fn with_retention(optimal_retention: f32) -> Self {
        Self::try_with_retention(optimal_retention)
            .expect("FSRS initialization with default parameters should not fail")
    }

    /// Schedule an item with no previous memory state.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::FsrsError` if FSRS scheduling fails.
    pub fn schedule_new(&self, reviewed_at: DateTime<Utc>) -> Result<ScheduledStates, SchedulerError> {
        let next = self
            .fsrs
            .next_states(None, self.optimal_retention, 0)
            .map_err(|e| SchedulerError::FsrsError(e.to_string()))?;

        Ok(ScheduledStates {
            again: self.to_outcome(&next.again, reviewed_at, 0.0),
            hard: self.to_outcome(&next.hard, reviewed_at, 0.0),
            good: self.to_outcome(&next.good, reviewed_at, 0.0),
            easy: self.to_outcome(&next.easy, reviewed_at, 0.0),
        })
    }

    /// Schedule an item from its stored memory state.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidElapsedDays` if `elapsed_days` is
    /// negative or non-finite, `SchedulerError::FsrsError` if FSRS fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn schedule_review(
        &self,
        state: &MemoryState,
        elapsed_days: f64,
        reviewed_at: DateTime<Utc>,
    ) -> Result<ScheduledStates, SchedulerError> {
        if !elapsed_days.is_finite() || elapsed_days < 0.0 {
            return Err(SchedulerError::InvalidElapsedDays { provided: elapsed_days });
        }

        let fsrs_state = fsrs::MemoryState {
            stability: state.stability as f32,
            difficulty: state.difficulty as f32,
        };

        let next = self
            .fsrs
            .next_states(
                Some(fsrs_state),
                self.optimal_retention,
                elapsed_days.round() as u32,
            )
            .map_err(|e| SchedulerError::FsrsError(e.to_string()))?;

        Ok(ScheduledStates {
            again: self.to_outcome(&next.again, reviewed_at, elapsed_days),
            hard: self.to_outcome(&next.hard, reviewed_at, elapsed_days),
            good: self.to_outcome(&next.good, reviewed_at, elapsed_days),
            easy: self.to_outcome(&next.easy, reviewed_at, elapsed_days),
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::unused_self)]
    fn to_outcome(
        &self,
        item: &fsrs::ItemState,
        now: DateTime<Utc>,
        elapsed_days: f64,
    ) -> ReviewOutcome {
        // round the interval, never less than one day
        let interval_days = item.interval.round().max(1.0);
        let next_review = now + Duration::days(interval_days as i64);

        ReviewOutcome::new(
            next_review,
            f64::from(item.memory.stability),
            f64::from(item.memory.difficulty),
            elapsed_days,
            f64::from(interval_days),
        )
    }

    #[must_use]
    pub fn optimal_retention(&self) -> f32 {
        self.optimal_retention
    }

    /// Grade one review and return the chosen schedule with its new memory.
    ///
    /// - With no `previous` state the item is scheduled as new (elapsed ignored).
    /// - Otherwise `elapsed_days` is the time since the previous review.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidElapsedDays` if elapsed is negative or non-finite.
    /// Returns `SchedulerError::FsrsError` if FSRS scheduling fails.
    pub fn apply(
        &self,
        previous: Option<&MemoryState>,
        grade: ReviewGrade,
        reviewed_at: DateTime<Utc>,
        elapsed_days: f64,
    ) -> Result<AppliedReview, SchedulerError> {
        let states = match previous {
            Some(state) => self.schedule_review(state, elapsed_days, reviewed_at)?,
            None => self.schedule_new(reviewed_at)?,
        };

        let outcome = states.select(grade).clone();
        let memory = MemoryState::from_outcome(&outcome);

        Ok(AppliedReview {
            grade,
            outcome,
            memory,
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Fractional days between two instants, clamped at zero so clock skew
/// never produces a negative interval.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn elapsed_days(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let seconds = (now - since).num_seconds().max(0);
    seconds as f64 / 86_400.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
