//! Per-hypothesis step grading.
//!
//! Every report produces one elimination step for each hypothesis other than
//! the final one, plus a single support step for the final hypothesis. Each
//! step lands in exactly one [`StepStatus`] by a fixed precedence table.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::case::Case;
use crate::config::PointsCfg;
use crate::constants::{STEP_KEY_ELIMINATION, STEP_KEY_SUPPORT};
use crate::reference::{JustificationItem, normalize};
use crate::rules::partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    OkNoisy,
    Invalid,
    Trap,
}

impl StepStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::OkNoisy => "ok_noisy",
            Self::Invalid => "invalid",
            Self::Trap => "trap",
        }
    }

    /// Sound reasoning, with or without padding.
    #[must_use]
    pub const fn is_sound(self) -> bool {
        matches!(self, Self::Ok | Self::OkNoisy)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Elimination,
    Support,
}

impl StepKind {
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Elimination => STEP_KEY_ELIMINATION,
            Self::Support => STEP_KEY_SUPPORT,
        }
    }

    /// Verb used in player-facing bullets.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Elimination => "Eliminating",
            Self::Support => "Supporting",
        }
    }
}

/// One graded line of the report ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_key: String,
    pub hypothesis_id: String,
    pub kind: StepKind,
    pub status: StepStatus,
    pub points: i32,
    pub note: String,
}

impl StepResult {
    fn graded(
        kind: StepKind,
        hypothesis_id: &str,
        status: StepStatus,
        points: &PointsCfg,
        note: String,
    ) -> Self {
        log::debug!(
            "{}:{hypothesis_id} graded {status} ({} pts)",
            kind.key_prefix(),
            points.for_status(status)
        );
        Self {
            step_key: format!("{}:{hypothesis_id}", kind.key_prefix()),
            hypothesis_id: hypothesis_id.to_string(),
            kind,
            status,
            points: points.for_status(status),
            note,
        }
    }
}

/// Grade the player's reasons for eliminating `hypothesis_id`.
///
/// Precedence: no reasons, then any pro or decoy reason, then missing anti
/// reason all give [`StepStatus::Invalid`]; anti reasons padded with
/// irrelevant ones give [`StepStatus::OkNoisy`]; only anti reasons give
/// [`StepStatus::Ok`].
#[must_use]
pub fn evaluate_elimination(
    case: &Case,
    points: &PointsCfg,
    hypothesis_id: &str,
    justifications: &[JustificationItem],
) -> StepResult {
    let refs = normalize(justifications);
    let split = partition(&case.rules, hypothesis_id, &refs);
    let title = case.hypothesis_title(hypothesis_id);
    let (status, note) = if split.is_empty() {
        (
            StepStatus::Invalid,
            "Eliminated without any reason.".to_string(),
        )
    } else if !split.in_pro.is_empty() || !split.in_decoy.is_empty() {
        (
            StepStatus::Invalid,
            format!("The reasons you chose do not rule out {title}."),
        )
    } else if split.in_anti.is_empty() {
        (
            StepStatus::Invalid,
            format!("Eliminating {title} is not backed by a reason against it."),
        )
    } else if !split.rest.is_empty() {
        (
            StepStatus::OkNoisy,
            "The elimination is right, but one reason added nothing.".to_string(),
        )
    } else {
        (
            StepStatus::Ok,
            "The elimination is right and convincing.".to_string(),
        )
    };
    StepResult::graded(StepKind::Elimination, hypothesis_id, status, points, note)
}

/// Grade the references offered in support of the final hypothesis.
///
/// For the correct hypothesis only pro references count, anti or decoy ones
/// invalidate the step. For an incorrect hypothesis a decoy reference is a
/// [`StepStatus::Trap`], anything else is [`StepStatus::Invalid`].
#[must_use]
pub fn evaluate_support(
    case: &Case,
    points: &PointsCfg,
    final_id: &str,
    justifications: &[JustificationItem],
) -> StepResult {
    let refs = normalize(justifications);
    let split = partition(&case.rules, final_id, &refs);
    let title = case.hypothesis_title(final_id);
    let (status, note) = if split.is_empty() {
        (
            StepStatus::Invalid,
            "The support is empty. Pick at least one reason.".to_string(),
        )
    } else if case.is_correct(final_id) {
        if !split.in_anti.is_empty() || !split.in_decoy.is_empty() {
            (
                StepStatus::Invalid,
                format!("The support you chose does not clearly strengthen {title}."),
            )
        } else if split.in_pro.is_empty() {
            (
                StepStatus::Invalid,
                format!("The support you chose is not convincing for {title}."),
            )
        } else if !split.rest.is_empty() {
            (
                StepStatus::OkNoisy,
                "Good support, but one reason was not useful.".to_string(),
            )
        } else {
            (
                StepStatus::Ok,
                "The support is convincing and builds on what was gathered.".to_string(),
            )
        }
    } else if !split.in_decoy.is_empty() {
        (
            StepStatus::Trap,
            "That information looks convincing, but it cannot carry a decision.".to_string(),
        )
    } else {
        (
            StepStatus::Invalid,
            format!("The support you chose does not establish {title}."),
        )
    };
    StepResult::graded(StepKind::Support, final_id, status, points, note)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case() -> Case {
        Case::case001().unwrap()
    }

    fn ev(id: &str) -> JustificationItem {
        JustificationItem::evidence(id)
    }

    fn iv(id: &str) -> JustificationItem {
        JustificationItem::interview(id)
    }

    #[test]
    fn elimination_with_only_anti_is_ok() {
        let step = evaluate_elimination(&case(), &PointsCfg::default(), "h1", &[ev("ev1")]);
        assert_eq!(step.status, StepStatus::Ok);
        assert_eq!(step.points, 25);
        assert_eq!(step.step_key, "elim:h1");
        assert_eq!(step.kind, StepKind::Elimination);
    }

    #[test]
    fn decoy_poisons_elimination() {
        let step = evaluate_elimination(
            &case(),
            &PointsCfg::default(),
            "h1",
            &[ev("ev1"), iv("q2_1")],
        );
        assert_eq!(step.status, StepStatus::Invalid);
        assert_eq!(step.points, 0);
    }

    #[test]
    fn irrelevant_padding_is_noisy() {
        let step = evaluate_elimination(
            &case(),
            &PointsCfg::default(),
            "h1",
            &[ev("ev1"), ev("ev3")],
        );
        assert_eq!(step.status, StepStatus::OkNoisy);
        assert_eq!(step.points, 18);
    }

    #[test]
    fn only_irrelevant_reasons_are_invalid() {
        let step = evaluate_elimination(&case(), &PointsCfg::default(), "h3", &[ev("ev3")]);
        assert_eq!(step.status, StepStatus::Invalid);
        assert!(step.note.contains("Market slowdown"));
    }

    #[test]
    fn unknown_references_count_as_irrelevant() {
        let step = evaluate_elimination(
            &case(),
            &PointsCfg::default(),
            "h4",
            &[iv("q2_3"), JustificationItem::data("nope")],
        );
        assert_eq!(step.status, StepStatus::OkNoisy);
    }

    #[test]
    fn support_for_correct_final() {
        let cfg = PointsCfg::default();
        let ok = evaluate_support(
            &case(),
            &cfg,
            "h2",
            &[iv("q2_2"), JustificationItem::data("insight_leads_quality_combined")],
        );
        assert_eq!(ok.status, StepStatus::Ok);
        assert_eq!(ok.step_key, "support:h2");

        let noisy = evaluate_support(&case(), &cfg, "h2", &[iv("q1_1"), ev("ev3")]);
        assert_eq!(noisy.status, StepStatus::OkNoisy);

        let irrelevant = evaluate_support(&case(), &cfg, "h2", &[iv("q2_1")]);
        assert_eq!(irrelevant.status, StepStatus::Invalid);
    }

    #[test]
    fn support_for_wrong_final_with_decoy_is_trap() {
        let step = evaluate_support(&case(), &PointsCfg::default(), "h4", &[ev("ev3")]);
        assert_eq!(step.status, StepStatus::Trap);
        assert_eq!(step.points, -10);
    }

    #[test]
    fn decoy_is_relative_to_the_final_hypothesis() {
        let step = evaluate_support(&case(), &PointsCfg::default(), "h1", &[ev("ev3")]);
        assert_eq!(step.status, StepStatus::Invalid);
    }

    #[test]
    fn empty_support_is_invalid_even_for_correct_final() {
        let step = evaluate_support(&case(), &PointsCfg::default(), "h2", &[]);
        assert_eq!(step.status, StepStatus::Invalid);
    }

    #[test]
    fn duplicates_do_not_change_the_grade() {
        let cfg = PointsCfg::default();
        let once = evaluate_elimination(&case(), &cfg, "h3", &[ev("ev2")]);
        let twice = evaluate_elimination(&case(), &cfg, "h3", &[ev("ev2"), ev("ev2")]);
        assert_eq!(once, twice);
    }
}
