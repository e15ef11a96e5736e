use anyhow::{Context, Result};
use std::sync::Arc;

use casefile_game::{
    BundledCaseLoader, Case, CaseLoader, CaseSession, GameState, GradingConfig, Phase,
    ReportOutcome, StepStatus, Submission,
};

use crate::logic::policy::GameplayStrategy;

/// Case played when none is named on the command line.
pub const DEFAULT_CASE_ID: &str = "case001";

/// Safety cap on actions per run; every built-in policy finishes well below it.
pub const DEFAULT_MAX_TURNS: u32 = 200;

/// Case and grading rules shared by every run of a tester.
#[derive(Debug)]
pub struct TesterAssets {
    pub case: Case,
    pub config: GradingConfig,
}

impl TesterAssets {
    /// Load a bundled case with the given grading rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the case is unknown or its content is invalid.
    pub fn load(case_id: &str, config: GradingConfig) -> Result<Self> {
        let case = BundledCaseLoader
            .load_case(case_id)
            .with_context(|| format!("loading case `{case_id}`"))?;
        Ok(Self { case, config })
    }

    /// Bundled first case with default grading.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled asset fails to load.
    pub fn load_default() -> Result<Self> {
        Self::load(DEFAULT_CASE_ID, GradingConfig::default())
    }
}

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: GameplayStrategy,
    pub max_turns: u32,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: GameplayStrategy) -> Self {
        Self {
            strategy,
            max_turns: DEFAULT_MAX_TURNS,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// One policy decision as it was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRecord {
    pub turn: u32,
    pub action: &'static str,
    pub rationale: Option<String>,
    /// Reducer error text when the action was refused.
    pub error: Option<String>,
}

/// Graded report as seen by the simulated player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedReport {
    pub outcome: ReportOutcome,
    pub score_percent: u8,
    pub correct_hypothesis: bool,
    pub invalid_steps: usize,
    pub noisy_steps: usize,
    pub trap_steps: usize,
    pub manager_message: String,
}

/// Aggregated counters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayabilityMetrics {
    pub turns: u32,
    pub investigations: u32,
    pub eliminations: u32,
    pub restores: u32,
    pub guard_hits: u32,
    pub exhausted_submissions: u32,
    pub refused_actions: u32,
    pub reports: Vec<GradedReport>,
    pub final_phase: Phase,
    pub time_left: u32,
    pub trust_left: u8,
    pub attempts_left: u8,
    pub decision_log: Vec<DecisionRecord>,
}

impl PlayabilityMetrics {
    fn new(state: &GameState) -> Self {
        Self {
            turns: 0,
            investigations: 0,
            eliminations: 0,
            restores: 0,
            guard_hits: 0,
            exhausted_submissions: 0,
            refused_actions: 0,
            reports: Vec::new(),
            final_phase: state.phase,
            time_left: state.time,
            trust_left: state.trust,
            attempts_left: state.attempts_left,
            decision_log: Vec::new(),
        }
    }

    #[must_use]
    pub fn last_report(&self) -> Option<&GradedReport> {
        self.reports.last()
    }

    #[must_use]
    pub fn first_outcome(&self) -> Option<ReportOutcome> {
        self.reports.first().map(|r| r.outcome)
    }

    #[must_use]
    pub fn best_score(&self) -> Option<u8> {
        self.reports.iter().map(|r| r.score_percent).max()
    }

    fn finish(&mut self, state: &GameState) {
        self.final_phase = state.phase;
        self.time_left = state.time;
        self.trust_left = state.trust;
        self.attempts_left = state.attempts_left;
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: GameplayStrategy,
    pub config: GradingConfig,
    pub metrics: PlayabilityMetrics,
    pub final_state: GameState,
    pub ending_message: String,
    pub game_ended: bool,
}

/// Headless deterministic runner for the case engine.
#[derive(Debug, Clone)]
pub struct GameTester {
    assets: Arc<TesterAssets>,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self { assets, verbose }
    }

    /// Tester over the bundled first case.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled case fails to load.
    pub fn try_new(verbose: bool) -> Result<Self> {
        Ok(Self::new(Arc::new(TesterAssets::load_default()?), verbose))
    }

    #[must_use]
    pub fn assets(&self) -> &TesterAssets {
        &self.assets
    }

    #[must_use]
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let mut session = CaseSession::new(self.assets.case.clone(), self.assets.config.clone());
        let mut metrics = PlayabilityMetrics::new(session.state());
        let mut ending_message = String::new();

        if let Err(err) = session.visit_office().and_then(|()| session.start()) {
            log::error!("could not start case {}: {err}", session.case().id);
            metrics.finish(session.state());
            return SimulationSummary {
                seed,
                strategy: plan.strategy,
                config: self.assets.config.clone(),
                metrics,
                final_state: session.into_state(),
                ending_message: err.to_string(),
                game_ended: false,
            };
        }

        let mut policy = plan.strategy.create_policy(seed);
        while metrics.turns < plan.max_turns {
            let Some(decision) = policy.next_action(&session) else {
                break;
            };
            metrics.turns += 1;
            let action_name = decision.action.name();
            match decision.action {
                casefile_game::Action::VisitEvidence { .. }
                | casefile_game::Action::AskQuestion { .. }
                | casefile_game::Action::DiscoverInsight { .. } => metrics.investigations += 1,
                casefile_game::Action::Eliminate { .. } => metrics.eliminations += 1,
                casefile_game::Action::Restore { .. } => metrics.restores += 1,
                _ => {}
            }

            let error = match session.apply(decision.action) {
                Ok(Some(submission)) => {
                    ending_message = submission.message().to_string();
                    self.record_submission(&mut metrics, &submission);
                    None
                }
                Ok(None) => None,
                Err(err) => {
                    metrics.refused_actions += 1;
                    log::debug!("{} refused {action_name}: {err}", policy.name());
                    Some(err.to_string())
                }
            };
            metrics.decision_log.push(DecisionRecord {
                turn: metrics.turns,
                action: action_name,
                rationale: decision.rationale,
                error,
            });
        }

        metrics.finish(session.state());
        let game_ended = session.phase().is_terminal();
        if self.verbose {
            println!(
                "    {} seed {seed}: {} after {} turns",
                policy.name(),
                session.phase(),
                metrics.turns
            );
        }
        SimulationSummary {
            seed,
            strategy: plan.strategy,
            config: self.assets.config.clone(),
            metrics,
            final_state: session.into_state(),
            ending_message,
            game_ended,
        }
    }

    fn record_submission(&self, metrics: &mut PlayabilityMetrics, submission: &Submission) {
        match submission {
            Submission::Graded { evaluation } => {
                if self.verbose {
                    println!(
                        "      report {}: {} ({}%)",
                        metrics.reports.len() + 1,
                        evaluation.outcome.as_str(),
                        evaluation.score_percent
                    );
                }
                metrics.reports.push(GradedReport {
                    outcome: evaluation.outcome,
                    score_percent: evaluation.score_percent,
                    correct_hypothesis: evaluation.correct_hypothesis,
                    invalid_steps: evaluation.count_status(StepStatus::Invalid),
                    noisy_steps: evaluation.count_status(StepStatus::OkNoisy),
                    trap_steps: evaluation.count_status(StepStatus::Trap),
                    manager_message: evaluation.manager_message.clone(),
                });
            }
            Submission::NotReady { .. } => metrics.guard_hits += 1,
            Submission::AttemptsExhausted => metrics.exhausted_submissions += 1,
        }
    }
}
