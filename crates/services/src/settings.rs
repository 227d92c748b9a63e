use lingo_core::scheduler::{DEFAULT_RETENTION, Scheduler, SchedulerError};
use lingo_core::spacing::DeckSpacing;

/// Tunables for the session engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    retention: f32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
        }
    }
}

impl EngineSettings {
    /// Settings with a custom FSRS desired retention.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::InvalidRetention` if `retention` is not in `(0, 1]`.
    pub fn try_new(retention: f32) -> Result<Self, SchedulerError> {
        Scheduler::try_with_retention(retention)?;
        Ok(Self { retention })
    }

    #[must_use]
    pub fn retention(&self) -> f32 {
        self.retention
    }

    /// Deck spacing policy using the same retention.
    #[must_use]
    pub fn deck_spacing(&self) -> DeckSpacing {
        DeckSpacing::new(self.retention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_is_validated() {
        assert!(EngineSettings::try_new(0.85).is_ok());
        assert!(matches!(
            EngineSettings::try_new(0.0),
            Err(SchedulerError::InvalidRetention { .. })
        ));
        assert!((EngineSettings::default().deck_spacing().retention() - 0.9).abs() < f32::EPSILON);
    }
}
