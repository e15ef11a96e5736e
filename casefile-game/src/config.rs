//! Grading configuration
use serde::{Deserialize, Serialize};

use crate::constants::{
    BONUS_CORRECT, MAX_JUSTIFICATIONS, NOISE_REVIEW_THRESHOLD, POINTS_INVALID, POINTS_OK,
    POINTS_OK_NOISY, POINTS_TRAP, REPORT_ATTEMPTS,
};
use crate::numbers::{ceil_f64_to_usize, usize_to_f64};
use crate::step::StepStatus;

/// Points awarded per step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsCfg {
    pub ok: i32,
    pub ok_noisy: i32,
    pub invalid: i32,
    pub trap: i32,
}

impl Default for PointsCfg {
    fn default() -> Self {
        Self {
            ok: POINTS_OK,
            ok_noisy: POINTS_OK_NOISY,
            invalid: POINTS_INVALID,
            trap: POINTS_TRAP,
        }
    }
}

impl PointsCfg {
    #[must_use]
    pub const fn for_status(&self, status: StepStatus) -> i32 {
        match status {
            StepStatus::Ok => self.ok,
            StepStatus::OkNoisy => self.ok_noisy,
            StepStatus::Invalid => self.invalid,
            StepStatus::Trap => self.trap,
        }
    }
}

/// How many noisy steps force an otherwise accepted report into review.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum NoisePolicy {
    /// A fixed count of noisy steps.
    Fixed(usize),
    /// A fraction of the ledger length, rounded up, never below one.
    Fraction(f64),
}

impl Default for NoisePolicy {
    fn default() -> Self {
        Self::Fixed(NOISE_REVIEW_THRESHOLD)
    }
}

impl NoisePolicy {
    /// Resolve the threshold for a ledger with `steps` entries.
    #[must_use]
    pub fn threshold(&self, steps: usize) -> usize {
        match *self {
            Self::Fixed(n) => n,
            Self::Fraction(f) => {
                let raw = ceil_f64_to_usize(f.max(0.0) * usize_to_f64(steps));
                raw.max(1)
            }
        }
    }
}

/// Tunable grading and play parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub points: PointsCfg,
    pub correct_bonus: i32,
    pub noise: NoisePolicy,
    pub attempts: u8,
    pub max_justifications: usize,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            points: PointsCfg::default(),
            correct_bonus: BONUS_CORRECT,
            noise: NoisePolicy::default(),
            attempts: REPORT_ATTEMPTS,
            max_justifications: MAX_JUSTIFICATIONS,
        }
    }
}

impl GradingConfig {
    /// Load configuration overrides from JSON; missing fields keep defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Highest achievable raw total for a case with `hypotheses` candidates.
    #[must_use]
    pub fn max_points(&self, hypotheses: usize) -> i32 {
        let steps = i32::try_from(hypotheses).unwrap_or(i32::MAX);
        steps
            .saturating_mul(self.points.ok)
            .saturating_add(self.correct_bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_tuning() {
        let cfg = GradingConfig::default();
        assert_eq!(cfg.points.for_status(StepStatus::Ok), 25);
        assert_eq!(cfg.points.for_status(StepStatus::OkNoisy), 18);
        assert_eq!(cfg.points.for_status(StepStatus::Invalid), 0);
        assert_eq!(cfg.points.for_status(StepStatus::Trap), -10);
        assert_eq!(cfg.correct_bonus, 10);
        assert_eq!(cfg.attempts, 3);
        assert_eq!(cfg.max_points(4), 110);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = GradingConfig::from_json(r#"{"attempts": 5, "points": {"trap": -20}}"#).unwrap();
        assert_eq!(cfg.attempts, 5);
        assert_eq!(cfg.points.trap, -20);
        assert_eq!(cfg.points.ok, 25);
        assert_eq!(cfg.noise, NoisePolicy::Fixed(3));
    }

    #[test]
    fn noise_policy_parses_tagged_form() {
        let cfg =
            GradingConfig::from_json(r#"{"noise": {"mode": "fraction", "value": 0.5}}"#).unwrap();
        assert_eq!(cfg.noise, NoisePolicy::Fraction(0.5));
    }

    #[test]
    fn fraction_threshold_rounds_up_with_floor_of_one() {
        assert_eq!(NoisePolicy::Fraction(0.5).threshold(4), 2);
        assert_eq!(NoisePolicy::Fraction(0.6).threshold(4), 3);
        assert_eq!(NoisePolicy::Fraction(0.0).threshold(4), 1);
        assert_eq!(NoisePolicy::Fixed(3).threshold(10), 3);
    }

    #[test]
    fn unbounded_fraction_never_forces_review() {
        let unbounded = NoisePolicy::Fraction(f64::INFINITY);
        assert_eq!(unbounded.threshold(4), usize::MAX);
        assert_eq!(NoisePolicy::Fraction(f64::NAN).threshold(4), 1);
        assert_eq!(NoisePolicy::Fraction(f64::NEG_INFINITY).threshold(4), 1);
    }
}
