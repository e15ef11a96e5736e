//! Report aggregation: ledger, score, outcome, issues and feedback.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::case::Case;
use crate::config::GradingConfig;
use crate::constants::SCORE_PERCENT_MAX;
use crate::narrative::{self, LearningCard};
use crate::numbers::ratio_to_percent;
use crate::reference::JustificationItem;
use crate::seed::SeededPicker;
use crate::step::{StepKind, StepResult, StepStatus, evaluate_elimination, evaluate_support};

/// Reasons given for eliminating one hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationInput {
    pub hypothesis_id: String,
    #[serde(default)]
    pub justifications: Vec<JustificationItem>,
}

/// Everything a player submits with a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportInput {
    #[serde(default)]
    pub eliminations: Vec<EliminationInput>,
    pub final_hypothesis_id: String,
    #[serde(default)]
    pub final_support: Vec<JustificationItem>,
}

impl ReportInput {
    /// Justifications for `hypothesis_id`; the last matching entry wins.
    #[must_use]
    pub fn elimination_for(&self, hypothesis_id: &str) -> &[JustificationItem] {
        self.eliminations
            .iter()
            .rev()
            .find(|e| e.hypothesis_id == hypothesis_id)
            .map(|e| e.justifications.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Accepted,
    Review,
    Rejected,
}

impl ReportOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Review => "review",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Noise,
    Invalid,
    Trap,
}

impl IssueKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::Invalid => "invalid",
            Self::Trap => "trap",
        }
    }

    const fn heading(self) -> &'static str {
        match self {
            Self::Invalid => "Needs correction",
            Self::Noise => "Extra unhelpful reasons",
            Self::Trap => "Fell for misleading information",
        }
    }

    const fn bullet(self) -> &'static str {
        match self {
            Self::Invalid => "the reason does not fit.",
            Self::Noise => "an extra reason that added nothing.",
            Self::Trap => "fell for tempting information.",
        }
    }

    const fn from_status(status: StepStatus) -> Option<Self> {
        match status {
            StepStatus::Ok => None,
            StepStatus::OkNoisy => Some(Self::Noise),
            StepStatus::Invalid => Some(Self::Invalid),
            StepStatus::Trap => Some(Self::Trap),
        }
    }
}

/// Player-facing bullets for one kind of mistake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueGroup {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub title: String,
    pub items: Vec<String>,
}

/// Graded result of one report submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEvaluation {
    pub outcome: ReportOutcome,
    pub accepted: bool,
    pub score_percent: u8,
    pub correct_hypothesis: bool,
    pub remaining_hypothesis_id: String,
    pub ledger: Vec<StepResult>,
    pub issues: Vec<IssueGroup>,
    pub learning_cards: Vec<LearningCard>,
    pub manager_message: String,
}

impl ReportEvaluation {
    #[must_use]
    pub fn support_step(&self) -> Option<&StepResult> {
        self.ledger.iter().find(|s| s.kind == StepKind::Support)
    }

    #[must_use]
    pub fn count_status(&self, status: StepStatus) -> usize {
        count_status(&self.ledger, status)
    }
}

fn count_status(ledger: &[StepResult], status: StepStatus) -> usize {
    ledger.iter().filter(|s| s.status == status).count()
}

/// Grade every step: eliminations in case order, then the final support.
#[must_use]
pub fn build_ledger(case: &Case, input: &ReportInput, config: &GradingConfig) -> Vec<StepResult> {
    let final_id = input.final_hypothesis_id.as_str();
    let mut ledger: Vec<StepResult> = case
        .hypothesis_ids()
        .filter(|id| *id != final_id)
        .map(|id| evaluate_elimination(case, &config.points, id, input.elimination_for(id)))
        .collect();
    ledger.push(evaluate_support(case, &config.points, final_id, &input.final_support));
    ledger
}

/// Score in `[0, 100]` against the case's maximum.
#[must_use]
pub fn score_percent(
    case: &Case,
    config: &GradingConfig,
    ledger: &[StepResult],
    correct: bool,
) -> u8 {
    let mut points: i32 = ledger.iter().map(|s| s.points).sum();
    if correct {
        points = points.saturating_add(config.correct_bonus);
    }
    ratio_to_percent(
        points,
        config.max_points(case.hypotheses.len()),
        SCORE_PERCENT_MAX,
    )
}

/// Classify a ledger.
///
/// Accepted needs a correct final, no invalid elimination, sound support and
/// fewer noisy steps than the threshold. A trap, an invalid support or a
/// wrong final is rejected. Everything else goes back for review.
#[must_use]
pub fn classify_outcome(
    correct: bool,
    ledger: &[StepResult],
    noise_threshold: usize,
) -> ReportOutcome {
    let support = ledger
        .iter()
        .find(|s| s.kind == StepKind::Support)
        .map_or(StepStatus::Invalid, |s| s.status);
    let invalid_elimination = ledger
        .iter()
        .any(|s| s.kind == StepKind::Elimination && s.status == StepStatus::Invalid);
    let noisy = count_status(ledger, StepStatus::OkNoisy);

    if correct && !invalid_elimination && support.is_sound() && noisy < noise_threshold {
        ReportOutcome::Accepted
    } else if !correct || matches!(support, StepStatus::Trap | StepStatus::Invalid) {
        ReportOutcome::Rejected
    } else {
        ReportOutcome::Review
    }
}

/// Group non-ok steps into invalid, noise and trap buckets, skipping empty ones.
#[must_use]
pub fn build_issues(case: &Case, ledger: &[StepResult]) -> Vec<IssueGroup> {
    [IssueKind::Invalid, IssueKind::Noise, IssueKind::Trap]
        .into_iter()
        .filter_map(|kind| {
            let items: Vec<String> = ledger
                .iter()
                .filter(|s| IssueKind::from_status(s.status) == Some(kind))
                .map(|s| {
                    format!(
                        "{} {}: {}",
                        s.kind.verb(),
                        case.hypothesis_title(&s.hypothesis_id),
                        kind.bullet()
                    )
                })
                .collect();
            (!items.is_empty()).then(|| IssueGroup {
                kind,
                title: kind.heading().to_string(),
                items,
            })
        })
        .collect()
}

/// Grade a full report for `case`.
///
/// Never fails: unknown hypotheses and references simply grade as invalid
/// or irrelevant.
#[must_use]
pub fn evaluate_report(
    case: &Case,
    input: &ReportInput,
    config: &GradingConfig,
) -> ReportEvaluation {
    let correct = case.is_correct(&input.final_hypothesis_id);
    let ledger = build_ledger(case, input, config);
    let threshold = config.noise.threshold(ledger.len());
    let outcome = classify_outcome(correct, &ledger, threshold);
    let score = score_percent(case, config, &ledger, correct);
    let issues = build_issues(case, &ledger);

    let picker = SeededPicker::from_seed_str(&narrative::seed_string(outcome, correct, &ledger));
    let narrative = narrative::compose(case, &picker, outcome, correct, &ledger, &issues);

    log::info!(
        "report for {} graded {outcome} at {score}% (final correct: {correct})",
        case.id
    );

    ReportEvaluation {
        outcome,
        accepted: outcome == ReportOutcome::Accepted,
        score_percent: score,
        correct_hypothesis: correct,
        remaining_hypothesis_id: input.final_hypothesis_id.clone(),
        ledger,
        issues,
        learning_cards: narrative.learning_cards,
        manager_message: narrative.manager_message,
    }
}
