//! Centralized grading and tuning constants for Casefile game logic.
//!
//! These values define the deterministic math for report grading. Keeping
//! them together means a balance change is a reviewed code change; JSON
//! overrides go through [`crate::config::GradingConfig`].

// Step points --------------------------------------------------------------
pub(crate) const POINTS_OK: i32 = 25;
pub(crate) const POINTS_OK_NOISY: i32 = 18;
pub(crate) const POINTS_INVALID: i32 = 0;
pub(crate) const POINTS_TRAP: i32 = -10;
pub(crate) const BONUS_CORRECT: i32 = 10;

// Report policy ------------------------------------------------------------
pub(crate) const NOISE_REVIEW_THRESHOLD: usize = 3;
pub(crate) const REPORT_ATTEMPTS: u8 = 3;
pub(crate) const MAX_JUSTIFICATIONS: usize = 2;
pub(crate) const SCORE_PERCENT_MAX: u8 = 100;

// Trust feedback -----------------------------------------------------------
pub(crate) const TRUST_DELTA_OK: i32 = 2;
pub(crate) const TRUST_DELTA_OK_NOISY: i32 = 1;
pub(crate) const TRUST_DELTA_INVALID: i32 = -2;
pub(crate) const TRUST_MAX: i32 = 100;

// Step keys ----------------------------------------------------------------
pub(crate) const STEP_KEY_ELIMINATION: &str = "elim";
pub(crate) const STEP_KEY_SUPPORT: &str = "support";

// Narrative slots ----------------------------------------------------------
pub(crate) const SLOT_OPENER: &str = "opener";
pub(crate) const SLOT_STRENGTH: &str = "strength";
pub(crate) const SLOT_WEAKNESS: &str = "weakness";
pub(crate) const SLOT_TONE: &str = "tone";
pub(crate) const SLOT_CLOSING: &str = "closing";
pub(crate) const SLOT_CARD_PREFIX: &str = "card.";

// Bundled case assets ------------------------------------------------------
pub(crate) const CASE001_ID: &str = "case001";
pub(crate) const CASE001_JSON: &str = include_str!("../assets/cases/case001.json");
