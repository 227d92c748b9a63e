use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_HALF_STEPS: u8 = 10;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("mastery score must be a half step in [0, 5], got {0}")]
pub struct InvalidMasteryScore(pub f64);

/// Per-card mastery on a `0..=5` scale with half-step resolution.
///
/// Stored as a count of half steps so partial credit (`+0.5`) never
/// accumulates floating point error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct MasteryScore(u8);

impl MasteryScore {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(MAX_HALF_STEPS);

    /// Builds a score from a half-step count, e.g. `9` is `4.5`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMasteryScore` when `half_steps` exceeds `10`.
    pub fn from_half_steps(half_steps: u8) -> Result<Self, InvalidMasteryScore> {
        if half_steps > MAX_HALF_STEPS {
            return Err(InvalidMasteryScore(f64::from(half_steps) / 2.0));
        }
        Ok(Self(half_steps))
    }

    /// Builds a score from a whole number of points, clamped to `5`.
    #[must_use]
    pub fn points(points: u8) -> Self {
        Self(points.saturating_mul(2).min(MAX_HALF_STEPS))
    }

    #[must_use]
    pub fn half_steps(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn value(self) -> f64 {
        f64::from(self.0) / 2.0
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn is_mastered(self) -> bool {
        self.0 >= MAX_HALF_STEPS
    }

    /// Raise by `half_steps`, saturating at `5`.
    #[must_use]
    pub fn raised(self, half_steps: u8) -> Self {
        Self(self.0.saturating_add(half_steps).min(MAX_HALF_STEPS))
    }

    /// Lower by `half_steps`, saturating at `0`.
    #[must_use]
    pub fn lowered(self, half_steps: u8) -> Self {
        Self(self.0.saturating_sub(half_steps))
    }
}

impl TryFrom<f64> for MasteryScore {
    type Error = InvalidMasteryScore;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let doubled = value * 2.0;
        if !value.is_finite() || !(0.0..=5.0).contains(&value) || doubled.fract() != 0.0 {
            return Err(InvalidMasteryScore(value));
        }
        Ok(Self(doubled as u8))
    }
}

impl From<MasteryScore> for f64 {
    fn from(score: MasteryScore) -> Self {
        score.value()
    }
}

impl fmt::Display for MasteryScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.0 / 2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_points_and_half_steps() {
        assert_eq!(MasteryScore::points(3).half_steps(), 6);
        assert_eq!(MasteryScore::points(9), MasteryScore::MAX);
        assert_eq!(MasteryScore::from_half_steps(9).unwrap().value(), 4.5);
        assert!(MasteryScore::from_half_steps(11).is_err());
    }

    #[test]
    fn try_from_f64_accepts_only_half_steps_in_range() {
        assert_eq!(MasteryScore::try_from(2.5).unwrap().half_steps(), 5);
        assert!(MasteryScore::try_from(2.25).is_err());
        assert!(MasteryScore::try_from(-0.5).is_err());
        assert!(MasteryScore::try_from(5.5).is_err());
        assert!(MasteryScore::try_from(f64::NAN).is_err());
    }

    #[test]
    fn raise_and_lower_saturate() {
        assert_eq!(MasteryScore::points(5).raised(2), MasteryScore::MAX);
        assert_eq!(MasteryScore::ZERO.lowered(2), MasteryScore::ZERO);
        assert_eq!(MasteryScore::points(2).lowered(2), MasteryScore::points(1));
    }

    #[test]
    fn displays_half_steps() {
        assert_eq!(MasteryScore::points(4).to_string(), "4");
        assert_eq!(MasteryScore::from_half_steps(7).unwrap().to_string(), "3.5");
    }
}
