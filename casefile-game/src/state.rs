//! Player progress and the pure transition function that advances it.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

use crate::case::{Case, Evidence, Hypothesis};
use crate::config::GradingConfig;
use crate::constants::{TRUST_DELTA_INVALID, TRUST_DELTA_OK, TRUST_DELTA_OK_NOISY, TRUST_MAX};
use crate::reference::{JustificationItem, ReasonRef, RefKind, dedup_items};
use crate::report::{EliminationInput, ReportEvaluation, ReportInput, evaluate_report};
use crate::step::{StepStatus, evaluate_elimination};

/// Justification list; at most two items survive validation.
pub type Justifications = SmallVec<[JustificationItem; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Briefing,
    Playing,
    Solved,
    Failed,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Briefing => "briefing",
            Self::Playing => "playing",
            Self::Solved => "solved",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Solved | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("`{action}` is not allowed while the game is {phase}")]
    WrongPhase { action: &'static str, phase: Phase },
    #[error("unknown hypothesis `{0}`")]
    UnknownHypothesis(String),
    #[error("`{0}` does not point at any content in this case")]
    UnknownReference(ReasonRef),
    #[error("`{0}` is the last hypothesis standing and cannot be eliminated")]
    LastHypothesis(String),
    #[error("{given} justification items given, at most {max} allowed")]
    TooManyJustifications { given: usize, max: usize },
    #[error("hypothesis `{0}` is not eliminated")]
    NotEliminated(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationRecord {
    pub hypothesis_id: String,
    pub justifications: Justifications,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// Everything that changes while a case is being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub case_id: String,
    pub phase: Phase,
    pub time: u32,
    pub trust: u8,
    pub attempts_left: u8,
    pub visited_office: bool,
    pub visited_evidence: Vec<String>,
    pub asked_questions: Vec<String>,
    pub discovered_insights: Vec<String>,
    pub eliminations: Vec<EliminationRecord>,
    pub selected_final: Option<String>,
    pub final_support: Justifications,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_report: Option<ReportEvaluation>,
}

/// A player intent fed to [`reduce`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    VisitOffice,
    StartGame,
    ResetGame,
    VisitEvidence { evidence_id: String },
    AskQuestion { question_id: String },
    DiscoverInsight { insight_id: String },
    Eliminate {
        hypothesis_id: String,
        justifications: Vec<JustificationItem>,
        timestamp_ms: i64,
    },
    Restore { hypothesis_id: String },
    SelectFinal { hypothesis_id: String },
    SetFinalSupport { items: Vec<JustificationItem> },
    SubmitReport,
}

impl Action {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::VisitOffice => "visit_office",
            Self::StartGame => "start_game",
            Self::ResetGame => "reset_game",
            Self::VisitEvidence { .. } => "visit_evidence",
            Self::AskQuestion { .. } => "ask_question",
            Self::DiscoverInsight { .. } => "discover_insight",
            Self::Eliminate { .. } => "eliminate",
            Self::Restore { .. } => "restore",
            Self::SelectFinal { .. } => "select_final",
            Self::SetFinalSupport { .. } => "set_final_support",
            Self::SubmitReport => "submit_report",
        }
    }
}

/// Why a submission was turned away before grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReportGuard {
    /// More than one hypothesis is still standing.
    TooManyRemaining { remaining: usize },
    /// The remaining hypothesis was not confirmed as the final answer.
    FinalNotConfirmed,
}

impl ReportGuard {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::TooManyRemaining { .. } => {
                "The report is not ready yet. Exactly one hypothesis must remain before you submit."
            }
            Self::FinalNotConfirmed => {
                "Before you submit, confirm the remaining hypothesis as the main cause."
            }
        }
    }
}

const ATTEMPTS_EXHAUSTED_MESSAGE: &str = "No attempts left. Restart the case to try again.";

/// Result of a `SubmitReport` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Submission {
    Graded { evaluation: Box<ReportEvaluation> },
    NotReady { guard: ReportGuard },
    AttemptsExhausted,
}

impl Submission {
    /// Player-facing manager text for this submission.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Graded { evaluation } => &evaluation.manager_message,
            Self::NotReady { guard } => guard.message(),
            Self::AttemptsExhausted => ATTEMPTS_EXHAUSTED_MESSAGE,
        }
    }

    #[must_use]
    pub fn evaluation(&self) -> Option<&ReportEvaluation> {
        match self {
            Self::Graded { evaluation } => Some(&**evaluation),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.evaluation().is_some_and(|e| e.accepted)
    }
}

/// Next state plus the submission outcome, when the action was a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: GameState,
    pub submission: Option<Submission>,
}

impl Transition {
    fn state(state: GameState) -> Self {
        Self {
            state,
            submission: None,
        }
    }
}

/// Interview with the stakeholder who gave it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedInterview<'a> {
    pub id: &'a str,
    pub stakeholder_name: &'a str,
    pub text: &'a str,
    pub response: &'a str,
    pub info_summary: String,
}

/// Insight with the name of its data set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredInsight<'a> {
    pub id: &'a str,
    pub data_set_name: &'a str,
    pub title: &'a str,
    pub description: &'a str,
}

/// Trust change for an elimination grade. Eliminations never grade as a
/// trap, so only support steps can produce that status.
const fn trust_delta(status: StepStatus) -> i32 {
    match status {
        StepStatus::Ok => TRUST_DELTA_OK,
        StepStatus::OkNoisy => TRUST_DELTA_OK_NOISY,
        StepStatus::Invalid | StepStatus::Trap => TRUST_DELTA_INVALID,
    }
}

fn push_unique(list: &mut Vec<String>, id: &str) -> bool {
    if list.iter().any(|seen| seen == id) {
        return false;
    }
    list.push(id.to_string());
    true
}

impl GameState {
    /// Fresh state for `case` in the briefing phase.
    #[must_use]
    pub fn new(case: &Case, config: &GradingConfig) -> Self {
        Self {
            case_id: case.id.clone(),
            phase: Phase::Briefing,
            time: case.resources.initial_time,
            trust: case.resources.initial_trust,
            attempts_left: config.attempts,
            visited_office: false,
            visited_evidence: Vec::new(),
            asked_questions: Vec::new(),
            discovered_insights: Vec::new(),
            eliminations: Vec::new(),
            selected_final: None,
            final_support: Justifications::new(),
            last_report: None,
        }
    }

    #[must_use]
    pub fn is_eliminated(&self, hypothesis_id: &str) -> bool {
        self.eliminations
            .iter()
            .any(|e| e.hypothesis_id == hypothesis_id)
    }

    #[must_use]
    pub fn elimination(&self, hypothesis_id: &str) -> Option<&EliminationRecord> {
        self.eliminations
            .iter()
            .find(|e| e.hypothesis_id == hypothesis_id)
    }

    /// Hypotheses not yet eliminated, in case order.
    #[must_use]
    pub fn remaining_hypotheses<'a>(&self, case: &'a Case) -> Vec<&'a Hypothesis> {
        case.hypotheses
            .iter()
            .filter(|h| !self.is_eliminated(&h.id))
            .collect()
    }

    #[must_use]
    pub fn discovered_evidence<'a>(&self, case: &'a Case) -> Vec<&'a Evidence> {
        case.evidence
            .iter()
            .filter(|ev| self.visited_evidence.contains(&ev.id))
            .collect()
    }

    #[must_use]
    pub fn completed_interviews<'a>(&self, case: &'a Case) -> Vec<CompletedInterview<'a>> {
        case.stakeholders
            .iter()
            .flat_map(|s| s.questions.iter().map(move |q| (s, q)))
            .filter(|(_, q)| self.asked_questions.contains(&q.id))
            .map(|(s, q)| CompletedInterview {
                id: &q.id,
                stakeholder_name: &s.name,
                text: &q.text,
                response: &q.response,
                info_summary: q
                    .info_summary
                    .clone()
                    .unwrap_or_else(|| format!("{}: {}", s.name, q.response)),
            })
            .collect()
    }

    #[must_use]
    pub fn discovered_insights<'a>(&self, case: &'a Case) -> Vec<DiscoveredInsight<'a>> {
        case.data_sets
            .iter()
            .flat_map(|set| set.insights.iter().map(move |i| (set, i)))
            .filter(|(_, i)| self.discovered_insights.contains(&i.id))
            .map(|(set, i)| DiscoveredInsight {
                id: &i.id,
                data_set_name: &set.name,
                title: &i.title,
                description: &i.description,
            })
            .collect()
    }

    /// The report the player would submit right now, if exactly one
    /// hypothesis remains.
    #[must_use]
    pub fn report_input(&self, case: &Case) -> Option<ReportInput> {
        let remaining = self.remaining_hypotheses(case);
        let [final_hypothesis] = remaining.as_slice() else {
            return None;
        };
        Some(ReportInput {
            eliminations: self
                .eliminations
                .iter()
                .map(|e| EliminationInput {
                    hypothesis_id: e.hypothesis_id.clone(),
                    justifications: e.justifications.to_vec(),
                })
                .collect(),
            final_hypothesis_id: final_hypothesis.id.clone(),
            final_support: self.final_support.to_vec(),
        })
    }

    fn require_phase(&self, action: &Action, phase: Phase) -> Result<(), ActionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(ActionError::WrongPhase {
                action: action.name(),
                phase: self.phase,
            })
        }
    }

    fn clear_final_draft(&mut self) {
        self.selected_final = None;
        self.final_support.clear();
    }

    fn adjust_trust(&mut self, delta: i32) {
        let next = (i32::from(self.trust) + delta).clamp(0, TRUST_MAX);
        self.trust = u8::try_from(next).unwrap_or(self.trust);
    }

    fn spend_time(&mut self, cost: u32) {
        self.time = self.time.saturating_sub(cost);
    }
}

fn checked_justifications(
    case: &Case,
    items: &[JustificationItem],
    max: usize,
) -> Result<Justifications, ActionError> {
    let unique = dedup_items(items);
    if unique.len() > max {
        return Err(ActionError::TooManyJustifications {
            given: unique.len(),
            max,
        });
    }
    if let Some(missing) = unique
        .iter()
        .map(JustificationItem::to_ref)
        .find(|r| !case.resolves(r))
    {
        return Err(ActionError::UnknownReference(missing));
    }
    Ok(unique.into_iter().collect())
}

fn require_hypothesis(case: &Case, hypothesis_id: &str) -> Result<(), ActionError> {
    if case.hypothesis(hypothesis_id).is_some() {
        Ok(())
    } else {
        Err(ActionError::UnknownHypothesis(hypothesis_id.to_string()))
    }
}

fn submit(case: &Case, config: &GradingConfig, state: &mut GameState) -> Submission {
    let Some(input) = state.report_input(case) else {
        let remaining = state.remaining_hypotheses(case).len();
        log::warn!("report submitted with {remaining} hypotheses standing");
        return Submission::NotReady {
            guard: ReportGuard::TooManyRemaining { remaining },
        };
    };
    if state.selected_final.as_deref() != Some(input.final_hypothesis_id.as_str()) {
        log::warn!("report submitted without confirming the remaining hypothesis");
        return Submission::NotReady {
            guard: ReportGuard::FinalNotConfirmed,
        };
    }

    let evaluation = evaluate_report(case, &input, config);
    if evaluation.accepted {
        state.phase = Phase::Solved;
    } else {
        state.attempts_left = state.attempts_left.saturating_sub(1);
        if state.attempts_left == 0 {
            state.phase = Phase::Failed;
        }
    }
    log::info!(
        "submission graded {}; {} attempts left, phase {}",
        evaluation.outcome,
        state.attempts_left,
        state.phase
    );
    state.last_report = Some(evaluation.clone());
    Submission::Graded {
        evaluation: Box::new(evaluation),
    }
}

/// Submission half of [`reduce`]: the next state plus what the submission
/// produced.
///
/// # Errors
///
/// Returns [`ActionError::WrongPhase`] when a report is filed outside play
/// while attempts remain.
pub fn reduce_submission(
    case: &Case,
    config: &GradingConfig,
    state: &GameState,
) -> Result<(GameState, Submission), ActionError> {
    let mut next = state.clone();
    if state.attempts_left == 0 {
        log::warn!("report submitted with no attempts left");
        return Ok((next, Submission::AttemptsExhausted));
    }
    state.require_phase(&Action::SubmitReport, Phase::Playing)?;
    let submission = submit(case, config, &mut next);
    Ok((next, submission))
}

/// Apply `action` to `state` without mutating it.
///
/// # Errors
///
/// Returns an [`ActionError`] when the action is not legal for the current
/// state; the caller's state is untouched in that case.
pub fn reduce(
    case: &Case,
    config: &GradingConfig,
    state: &GameState,
    action: Action,
) -> Result<Transition, ActionError> {
    let mut next = state.clone();
    match &action {
        Action::VisitOffice => next.visited_office = true,
        Action::StartGame => {
            state.require_phase(&action, Phase::Briefing)?;
            next.phase = Phase::Playing;
            next.attempts_left = config.attempts;
            log::info!("case {} started", case.id);
        }
        Action::ResetGame => {
            next = GameState::new(case, config);
            log::info!("case {} reset", case.id);
        }
        Action::VisitEvidence { evidence_id } => {
            state.require_phase(&action, Phase::Playing)?;
            let Some(evidence) = case.evidence_item(evidence_id) else {
                let missing = ReasonRef::new(RefKind::Evidence, evidence_id.clone());
                return Err(ActionError::UnknownReference(missing));
            };
            if push_unique(&mut next.visited_evidence, evidence_id) {
                next.spend_time(evidence.cost);
            }
        }
        Action::AskQuestion { question_id } => {
            state.require_phase(&action, Phase::Playing)?;
            let Some((_, question)) = case.question(question_id) else {
                let missing = ReasonRef::new(RefKind::Interview, question_id.clone());
                return Err(ActionError::UnknownReference(missing));
            };
            if push_unique(&mut next.asked_questions, question_id) {
                next.spend_time(question.cost);
            }
        }
        Action::DiscoverInsight { insight_id } => {
            state.require_phase(&action, Phase::Playing)?;
            if case.insight(insight_id).is_none() {
                let missing = ReasonRef::new(RefKind::Data, insight_id.clone());
                return Err(ActionError::UnknownReference(missing));
            }
            push_unique(&mut next.discovered_insights, insight_id);
        }
        Action::Eliminate {
            hypothesis_id,
            justifications,
            timestamp_ms,
        } => {
            state.require_phase(&action, Phase::Playing)?;
            require_hypothesis(case, hypothesis_id)?;
            if !state.is_eliminated(hypothesis_id) && state.remaining_hypotheses(case).len() <= 1 {
                return Err(ActionError::LastHypothesis(hypothesis_id.clone()));
            }
            let items = checked_justifications(case, justifications, config.max_justifications)?;
            let step = evaluate_elimination(case, &config.points, hypothesis_id, &items);
            next.adjust_trust(trust_delta(step.status));
            next.eliminations.retain(|e| &e.hypothesis_id != hypothesis_id);
            next.eliminations.push(EliminationRecord {
                hypothesis_id: hypothesis_id.clone(),
                justifications: items,
                timestamp_ms: *timestamp_ms,
            });
            next.clear_final_draft();
        }
        Action::Restore { hypothesis_id } => {
            state.require_phase(&action, Phase::Playing)?;
            require_hypothesis(case, hypothesis_id)?;
            if !state.is_eliminated(hypothesis_id) {
                return Err(ActionError::NotEliminated(hypothesis_id.clone()));
            }
            next.eliminations.retain(|e| &e.hypothesis_id != hypothesis_id);
            next.clear_final_draft();
        }
        Action::SelectFinal { hypothesis_id } => {
            state.require_phase(&action, Phase::Playing)?;
            require_hypothesis(case, hypothesis_id)?;
            next.selected_final = Some(hypothesis_id.clone());
        }
        Action::SetFinalSupport { items } => {
            state.require_phase(&action, Phase::Playing)?;
            next.final_support = checked_justifications(case, items, config.max_justifications)?;
        }
        Action::SubmitReport => {
            let (state, submission) = reduce_submission(case, config, state)?;
            return Ok(Transition {
                state,
                submission: Some(submission),
            });
        }
    }
    Ok(Transition::state(next))
}
