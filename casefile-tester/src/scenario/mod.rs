//! Scripted scenarios: a strategy plus the expectations its runs must meet.
use anyhow::{Result, ensure};

use casefile_game::{Case, Phase, ReportOutcome, evaluate_report};

use crate::logic::{GameplayStrategy, SimulationPlan, SimulationSummary};

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

struct CatalogEntry {
    key: &'static str,
    description: &'static str,
    build: fn() -> SimulationPlan,
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "smoke",
        description: "Careful player solves the case with one clean report",
        build: smoke_plan,
    },
    CatalogEntry {
        key: "noisy-review",
        description: "Padded reasons draw a review, a cleaned report is accepted",
        build: noisy_review_plan,
    },
    CatalogEntry {
        key: "decoy-trap",
        description: "Decoy-backed wrong answer is rejected until attempts run out",
        build: decoy_trap_plan,
    },
    CatalogEntry {
        key: "report-guards",
        description: "Premature submissions are turned away without costing attempts",
        build: report_guards_plan,
    },
    CatalogEntry {
        key: "random-sweep",
        description: "Seeded random players always reach a consistent ending",
        build: random_sweep_plan,
    },
    CatalogEntry {
        key: "feedback-determinism",
        description: "Manager feedback replays identically from the stored report",
        build: feedback_determinism_plan,
    },
];

/// `(key, description)` for every catalog scenario.
#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    CATALOG.iter().map(|e| (e.key, e.description)).collect()
}

#[must_use]
pub fn scenario_keys() -> Vec<String> {
    CATALOG.iter().map(|e| e.key.to_string()).collect()
}

#[must_use]
pub fn get_scenario(name: &str) -> Option<TestScenario> {
    CATALOG
        .iter()
        .find(|e| e.key == name)
        .map(|e| TestScenario::simulation(e.key, (e.build)()))
}

fn smoke_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Careful)
        .with_expectation(expect_phase(Phase::Solved))
        .with_expectation(|summary: &SimulationSummary| {
            let metrics = &summary.metrics;
            ensure!(
                metrics.reports.len() == 1,
                "expected a single report, got {}",
                metrics.reports.len()
            );
            ensure!(
                metrics.best_score() == Some(100),
                "expected a perfect score, got {:?}",
                metrics.best_score()
            );
            ensure!(
                metrics.refused_actions == 0,
                "{} actions were refused",
                metrics.refused_actions
            );
            Ok(())
        })
}

fn noisy_review_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Padded)
        .with_expectation(expect_phase(Phase::Solved))
        .with_expectation(|summary: &SimulationSummary| {
            let metrics = &summary.metrics;
            ensure!(
                metrics.first_outcome() == Some(ReportOutcome::Review),
                "first report should be sent back for review, got {:?}",
                metrics.first_outcome()
            );
            let first = &metrics.reports[0];
            ensure!(
                first.correct_hypothesis,
                "padding must not change the verdict"
            );
            ensure!(
                first.noisy_steps >= 3,
                "expected at least three noisy steps, got {}",
                first.noisy_steps
            );
            ensure!(metrics.reports.len() == 2, "expected exactly one retry");
            ensure!(metrics.attempts_left == 2, "review should cost an attempt");
            Ok(())
        })
}

fn decoy_trap_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Gullible)
        .with_expectation(expect_phase(Phase::Failed))
        .with_expectation(|summary: &SimulationSummary| {
            let metrics = &summary.metrics;
            ensure!(metrics.attempts_left == 0, "attempts should be exhausted");
            ensure!(
                metrics.reports.len() == 3,
                "expected three graded reports, got {}",
                metrics.reports.len()
            );
            for report in &metrics.reports {
                ensure!(
                    report.outcome == ReportOutcome::Rejected,
                    "decoy report was {:?}",
                    report.outcome
                );
                ensure!(
                    report.trap_steps == 1,
                    "decoy support should be flagged as a trap"
                );
            }
            Ok(())
        })
        .with_expectation(expect_private_feedback)
}

fn report_guards_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Hasty)
        .with_expectation(expect_phase(Phase::Solved))
        .with_expectation(|summary: &SimulationSummary| {
            let metrics = &summary.metrics;
            ensure!(
                metrics.guard_hits == 2,
                "expected two guard hits, got {}",
                metrics.guard_hits
            );
            ensure!(
                metrics.attempts_left == 3,
                "guards must not consume attempts"
            );
            Ok(())
        })
}

fn random_sweep_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Random)
        .with_expectation(|summary: &SimulationSummary| {
            ensure!(
                summary.game_ended,
                "random run stalled in {}",
                summary.metrics.final_phase
            );
            Ok(())
        })
        .with_expectation(expect_attempt_accounting)
        .with_expectation(expect_private_feedback)
}

fn feedback_determinism_plan() -> SimulationPlan {
    SimulationPlan::new(GameplayStrategy::Random).with_expectation(expect_replayable_feedback)
}

fn expect_phase(phase: Phase) -> impl Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static {
    move |summary| {
        ensure!(
            summary.metrics.final_phase == phase,
            "expected phase {phase}, ended in {}",
            summary.metrics.final_phase
        );
        Ok(())
    }
}

/// The stored evaluation of a finished run grades the same way again.
fn expect_replayable_feedback(summary: &SimulationSummary) -> Result<()> {
    let Some(stored) = summary.final_state.last_report.as_ref() else {
        return Ok(());
    };
    if !summary.game_ended {
        return Ok(());
    }
    let case = Case::bundled(&summary.final_state.case_id)?;
    let Some(input) = summary.final_state.report_input(&case) else {
        return Ok(());
    };
    let replayed = evaluate_report(&case, &input, &summary.config);
    ensure!(
        &replayed == stored,
        "replayed evaluation differs from the stored report"
    );
    Ok(())
}

/// Every graded report that was not accepted costs exactly one attempt.
fn expect_attempt_accounting(summary: &SimulationSummary) -> Result<()> {
    let metrics = &summary.metrics;
    let failed = metrics
        .reports
        .iter()
        .filter(|r| r.outcome != ReportOutcome::Accepted)
        .count();
    let budget = summary.config.attempts;
    let spent = usize::from(budget.saturating_sub(metrics.attempts_left));
    ensure!(
        failed == spent,
        "{failed} failed reports but {spent} attempts spent"
    );
    if metrics.final_phase == Phase::Solved {
        let last = metrics.last_report().map(|r| r.outcome);
        ensure!(
            last == Some(ReportOutcome::Accepted),
            "solved without an accepted report"
        );
    }
    Ok(())
}

/// Feedback on a wrong final answer never names the right one.
fn expect_private_feedback(summary: &SimulationSummary) -> Result<()> {
    let case = Case::bundled(&summary.final_state.case_id)?;
    let Some(correct) = case.hypothesis(&case.solution.correct_hypothesis_id) else {
        return Ok(());
    };
    let reports = &summary.metrics.reports;
    for report in reports.iter().filter(|r| !r.correct_hypothesis) {
        ensure!(
            !report.manager_message.contains(correct.title.as_str()),
            "feedback on a wrong answer revealed the solution"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameTester;

    #[test]
    fn catalog_keys_are_unique_and_resolvable() {
        let keys = scenario_keys();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());
        for key in &keys {
            assert!(get_scenario(key).is_some(), "{key} missing");
        }
        assert!(get_scenario("nope").is_none());
    }

    #[test]
    fn every_catalog_scenario_passes_on_a_few_seeds() {
        let tester = GameTester::try_new(false).unwrap();
        for key in scenario_keys() {
            let scenario = get_scenario(&key).unwrap();
            for seed in [1_u64, 1337, 90_210] {
                let summary = tester.run_plan(&scenario.plan, seed);
                for expectation in &scenario.plan.expectations {
                    expectation
                        .evaluate(&summary)
                        .unwrap_or_else(|err| panic!("{key} seed {seed}: {err:#}"));
                }
            }
        }
    }
}
