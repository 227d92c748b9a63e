/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    /// Questions in this run.
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    /// Correct answers across the logical session, including earlier runs.
    pub score: u32,
    pub next_question_number: u32,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Fraction of this run answered, in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f64 / self.total as f64
    }
}
