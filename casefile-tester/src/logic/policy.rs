use std::fmt;

use casefile_game::{
    Action, Case, CaseSession, JustificationItem, RefClass, ReportOutcome, StepKind, StepStatus,
};
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Fixed clock for simulated eliminations so replays stay byte-identical.
const SIM_EPOCH_MS: i64 = 1_704_067_200_000;
const SIM_STEP_MS: i64 = 60_000;

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub action: Action,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub fn new(action: Action, rationale: Option<String>) -> Self {
        Self { action, rationale }
    }

    fn plain(action: Action) -> Self {
        Self::new(action, None)
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Next action for a session in play, or `None` to stop.
    fn next_action(&mut self, session: &CaseSession) -> Option<PolicyDecision>;
}

/// Built-in gameplay strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GameplayStrategy {
    Careful,
    Padded,
    Gullible,
    Hasty,
    Random,
}

impl GameplayStrategy {
    pub const ALL: [Self; 5] = [
        Self::Careful,
        Self::Padded,
        Self::Gullible,
        Self::Hasty,
        Self::Random,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Careful => "Careful",
            Self::Padded => "Padded",
            Self::Gullible => "Gullible",
            Self::Hasty => "Hasty",
            Self::Random => "Random",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Careful => Box::new(Casework::new(CarefulDetective)),
            Self::Padded => Box::new(Casework::new(PaddedDetective::default())),
            Self::Gullible => Box::new(Casework::new(GullibleDetective)),
            Self::Hasty => Box::new(Casework::new(HastyDetective::default())),
            Self::Random => Box::new(Casework::new(RandomDetective::new(seed))),
        }
    }
}

impl fmt::Display for GameplayStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a simulated player reasons about a case. [`Casework`] turns these
/// answers into the usual investigate, eliminate, confirm, submit loop.
trait Detective {
    fn name(&self) -> &'static str;

    /// Hook run before the regular loop; returning a decision pre-empts it.
    fn intervene(&mut self, _session: &CaseSession) -> Option<PolicyDecision> {
        None
    }

    /// Whether to keep opening unseen sources.
    fn keeps_investigating(&mut self, _session: &CaseSession) -> bool {
        true
    }

    /// Hypothesis the player means to keep as the final answer.
    fn suspect(&mut self, session: &CaseSession) -> String;

    fn reasons_against(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem>;

    fn reasons_for(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem>;
}

struct Casework<D> {
    detective: D,
    support_pending: bool,
    clock: i64,
}

impl<D: Detective> Casework<D> {
    const fn new(detective: D) -> Self {
        Self {
            detective,
            support_pending: false,
            clock: SIM_EPOCH_MS,
        }
    }

    fn eliminate(&mut self, hypothesis_id: &str, justifications: Vec<JustificationItem>) -> Action {
        self.clock += SIM_STEP_MS;
        Action::Eliminate {
            hypothesis_id: hypothesis_id.to_string(),
            justifications,
            timestamp_ms: self.clock,
        }
    }
}

impl<D: Detective + Send> PlayerPolicy for Casework<D> {
    fn name(&self) -> &'static str {
        self.detective.name()
    }

    fn next_action(&mut self, session: &CaseSession) -> Option<PolicyDecision> {
        if session.phase().is_terminal() {
            return None;
        }
        if let Some(decision) = self.detective.intervene(session) {
            if let Action::Eliminate {
                hypothesis_id,
                justifications,
                ..
            } = decision.action
            {
                let action = self.eliminate(&hypothesis_id, justifications);
                return Some(PolicyDecision::new(action, decision.rationale));
            }
            return Some(decision);
        }

        if self.detective.keeps_investigating(session)
            && let Some(action) = next_unseen_source(session)
        {
            return Some(PolicyDecision::new(action, Some("investigate".to_string())));
        }

        let suspect = self.detective.suspect(session);
        let state = session.state();
        let target = session
            .remaining_hypotheses()
            .into_iter()
            .map(|h| h.id.clone())
            .find(|id| *id != suspect);
        if let Some(target) = target {
            let reasons = self.detective.reasons_against(session, &target);
            let rationale = format!("rule out {target} with {} reason(s)", reasons.len());
            let action = self.eliminate(&target, reasons);
            return Some(PolicyDecision::new(action, Some(rationale)));
        }

        let remaining = session
            .remaining_hypotheses()
            .first()
            .map(|h| h.id.clone())?;
        if state.selected_final.as_deref() != Some(remaining.as_str()) {
            self.support_pending = true;
            return Some(PolicyDecision::new(
                Action::SelectFinal {
                    hypothesis_id: remaining,
                },
                Some("confirm the last hypothesis".to_string()),
            ));
        }
        if self.support_pending {
            self.support_pending = false;
            let items = self.detective.reasons_for(session, &remaining);
            return Some(PolicyDecision::new(
                Action::SetFinalSupport { items },
                Some("draft support".to_string()),
            ));
        }
        Some(PolicyDecision::plain(Action::SubmitReport))
    }
}

struct CarefulDetective;

impl Detective for CarefulDetective {
    fn name(&self) -> &'static str {
        "Careful"
    }

    fn suspect(&mut self, session: &CaseSession) -> String {
        session.case().solution.correct_hypothesis_id.clone()
    }

    fn reasons_against(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        classified_refs(session.case(), target, RefClass::Anti)
            .into_iter()
            .take(1)
            .collect()
    }

    fn reasons_for(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        let max = session.config().max_justifications;
        classified_refs(session.case(), target, RefClass::Pro)
            .into_iter()
            .take(max)
            .collect()
    }
}

/// Pads every elimination with an unrelated reason, then strips the padding
/// once the manager sends the report back for review.
#[derive(Default)]
struct PaddedDetective {
    cleaned: bool,
}

impl Detective for PaddedDetective {
    fn name(&self) -> &'static str {
        "Padded"
    }

    fn intervene(&mut self, session: &CaseSession) -> Option<PolicyDecision> {
        let report = session.state().last_report.as_ref()?;
        if report.outcome != ReportOutcome::Review {
            return None;
        }
        let noisy = report.ledger.iter().find(|step| {
            step.kind == StepKind::Elimination
                && step.status == StepStatus::OkNoisy
                && session
                    .state()
                    .elimination(&step.hypothesis_id)
                    .is_some_and(|e| e.justifications.len() > 1)
        });
        let Some(step) = noisy else {
            self.cleaned = true;
            return None;
        };
        let clean = CarefulDetective.reasons_against(session, &step.hypothesis_id);
        Some(PolicyDecision::new(
            Action::Eliminate {
                hypothesis_id: step.hypothesis_id.clone(),
                justifications: clean,
                timestamp_ms: 0,
            },
            Some(format!("drop padding from {}", step.step_key)),
        ))
    }

    fn suspect(&mut self, session: &CaseSession) -> String {
        CarefulDetective.suspect(session)
    }

    fn reasons_against(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        let mut reasons = CarefulDetective.reasons_against(session, target);
        if !self.cleaned {
            let padding = classified_refs(session.case(), target, RefClass::Irrelevant);
            reasons.extend(padding.into_iter().take(1));
        }
        reasons
    }

    fn reasons_for(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        CarefulDetective.reasons_for(session, target)
    }
}

/// Believes the first hypothesis that comes with a convincing-looking decoy.
struct GullibleDetective;

impl Detective for GullibleDetective {
    fn name(&self) -> &'static str {
        "Gullible"
    }

    fn suspect(&mut self, session: &CaseSession) -> String {
        let case = session.case();
        case.hypotheses
            .iter()
            .find(|h| {
                !case.is_correct(&h.id)
                    && case.rule_profile(&h.id).is_some_and(|p| !p.decoy.is_empty())
            })
            .or_else(|| case.hypotheses.first())
            .map(|h| h.id.clone())
            .unwrap_or_default()
    }

    fn reasons_against(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        let anti = CarefulDetective.reasons_against(session, target);
        if anti.is_empty() {
            classified_refs(session.case(), target, RefClass::Irrelevant)
                .into_iter()
                .take(1)
                .collect()
        } else {
            anti
        }
    }

    fn reasons_for(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        classified_refs(session.case(), target, RefClass::Decoy)
            .into_iter()
            .take(1)
            .collect()
    }
}

/// Tries to submit before the board is ready, once per guard.
#[derive(Default)]
struct HastyDetective {
    rushed_open_board: bool,
    rushed_unconfirmed: bool,
}

impl Detective for HastyDetective {
    fn name(&self) -> &'static str {
        "Hasty"
    }

    fn intervene(&mut self, session: &CaseSession) -> Option<PolicyDecision> {
        if !self.rushed_open_board {
            self.rushed_open_board = true;
            return Some(PolicyDecision::new(
                Action::SubmitReport,
                Some("submit before ruling anything out".to_string()),
            ));
        }
        if !self.rushed_unconfirmed
            && session.remaining_hypotheses().len() == 1
            && session.state().selected_final.is_none()
        {
            self.rushed_unconfirmed = true;
            return Some(PolicyDecision::new(
                Action::SubmitReport,
                Some("submit without confirming the final".to_string()),
            ));
        }
        None
    }

    fn keeps_investigating(&mut self, session: &CaseSession) -> bool {
        // Only opens what the careful elimination needs.
        let state = session.state();
        state.visited_evidence.is_empty() && state.asked_questions.is_empty()
    }

    fn suspect(&mut self, session: &CaseSession) -> String {
        CarefulDetective.suspect(session)
    }

    fn reasons_against(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        CarefulDetective.reasons_against(session, target)
    }

    fn reasons_for(&mut self, session: &CaseSession, target: &str) -> Vec<JustificationItem> {
        CarefulDetective.reasons_for(session, target)
    }
}

/// Seeded player that investigates, guesses and cites at random. After a
/// graded report that was not accepted it reopens one elimination and picks
/// a fresh suspect.
struct RandomDetective {
    rng: ChaCha20Rng,
    suspect: Option<String>,
    done_investigating: bool,
    attempts_seen: Option<u8>,
}

impl RandomDetective {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            suspect: None,
            done_investigating: false,
            attempts_seen: None,
        }
    }

    fn random_reasons(&mut self, session: &CaseSession) -> Vec<JustificationItem> {
        let pool = discovered_refs(session);
        let max = session.config().max_justifications.min(pool.len());
        let count = self.rng.random_range(0..=max);
        pool.choose_multiple(&mut self.rng, count)
            .cloned()
            .collect()
    }
}

impl Detective for RandomDetective {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn intervene(&mut self, session: &CaseSession) -> Option<PolicyDecision> {
        let attempts = session.state().attempts_left;
        let previous = self.attempts_seen.replace(attempts);
        if previous.is_none_or(|seen| seen == attempts) {
            return None;
        }
        self.suspect = None;
        let eliminated: Vec<String> = session
            .state()
            .eliminations
            .iter()
            .map(|e| e.hypothesis_id.clone())
            .collect();
        let reopen = eliminated.choose(&mut self.rng)?.clone();
        Some(PolicyDecision::new(
            Action::Restore {
                hypothesis_id: reopen,
            },
            Some("rethink after feedback".to_string()),
        ))
    }

    fn keeps_investigating(&mut self, _session: &CaseSession) -> bool {
        if !self.done_investigating && self.rng.random_bool(0.25) {
            self.done_investigating = true;
        }
        !self.done_investigating
    }

    fn suspect(&mut self, session: &CaseSession) -> String {
        if let Some(suspect) = &self.suspect
            && !session.state().is_eliminated(suspect)
        {
            return suspect.clone();
        }
        let remaining: Vec<String> = session
            .remaining_hypotheses()
            .into_iter()
            .map(|h| h.id.clone())
            .collect();
        let pick = remaining
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();
        self.suspect = Some(pick.clone());
        pick
    }

    fn reasons_against(&mut self, session: &CaseSession, _target: &str) -> Vec<JustificationItem> {
        self.random_reasons(session)
    }

    fn reasons_for(&mut self, session: &CaseSession, _target: &str) -> Vec<JustificationItem> {
        self.random_reasons(session)
    }
}

/// First evidence, question or insight the session has not opened yet.
fn next_unseen_source(session: &CaseSession) -> Option<Action> {
    let case = session.case();
    let state = session.state();
    let evidence = case
        .evidence
        .iter()
        .find(|e| !state.visited_evidence.contains(&e.id))
        .map(|e| Action::VisitEvidence {
            evidence_id: e.id.clone(),
        });
    let question = || {
        case.stakeholders
            .iter()
            .flat_map(|s| &s.questions)
            .find(|q| !state.asked_questions.contains(&q.id))
            .map(|q| Action::AskQuestion {
                question_id: q.id.clone(),
            })
    };
    let insight = || {
        case.data_sets
            .iter()
            .flat_map(|set| &set.insights)
            .find(|i| !state.discovered_insights.contains(&i.id))
            .map(|i| Action::DiscoverInsight {
                insight_id: i.id.clone(),
            })
    };
    evidence.or_else(question).or_else(insight)
}

/// Every reference the case can resolve, in authoring order.
fn all_refs(case: &Case) -> Vec<JustificationItem> {
    let evidence = case
        .evidence
        .iter()
        .map(|e| JustificationItem::evidence(e.id.clone()));
    let questions = case
        .stakeholders
        .iter()
        .flat_map(|s| &s.questions)
        .map(|q| JustificationItem::interview(q.id.clone()));
    let insights = case
        .data_sets
        .iter()
        .flat_map(|set| &set.insights)
        .map(|i| JustificationItem::data(i.id.clone()));
    evidence.chain(questions).chain(insights).collect()
}

fn discovered_refs(session: &CaseSession) -> Vec<JustificationItem> {
    let state = session.state();
    all_refs(session.case())
        .into_iter()
        .filter(|item| {
            let seen = match item.kind {
                casefile_game::RefKind::Evidence => &state.visited_evidence,
                casefile_game::RefKind::Interview => &state.asked_questions,
                casefile_game::RefKind::Data => &state.discovered_insights,
            };
            seen.contains(&item.id)
        })
        .collect()
}

fn classified_refs(case: &Case, hypothesis_id: &str, class: RefClass) -> Vec<JustificationItem> {
    let Some(profile) = case.rule_profile(hypothesis_id) else {
        return if class == RefClass::Irrelevant {
            all_refs(case)
        } else {
            Vec::new()
        };
    };
    all_refs(case)
        .into_iter()
        .filter(|item| profile.classify(&item.to_ref()) == class)
        .collect()
}
