use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};
use crate::scenario::TestScenario;
use crate::util::{artifacts_dir, write_failure_artifacts};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    tester: GameTester,
    verbose: bool,
    artifacts: Option<PathBuf>,
}

impl LogicTester {
    pub const fn new(tester: GameTester, verbose: bool) -> Self {
        Self {
            tester,
            verbose,
            artifacts: None,
        }
    }

    /// Write the final state of every failing iteration under `base`.
    #[must_use]
    pub fn with_artifacts(mut self, base: Option<PathBuf>) -> Self {
        self.artifacts = base;
        self
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            let result = self.run_single_scenario(scenario, seed, iterations);
            results.push(result);
        }

        results
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let (successes, failures, performance_data) =
            self.run_simulation_iterations(scenario, seed, iterations);

        let avg_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration: avg_duration,
            performance_data,
        }
    }

    fn run_simulation_iterations(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> (usize, Vec<String>, Vec<Duration>) {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let plan = &scenario.plan;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = self.tester.run_plan(plan, iteration_seed);

            if let Some(err) = evaluate_expectations(plan, &summary) {
                let context = summarize_decision_path(&summary);
                let metrics = &summary.metrics;
                failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, turns {}, phase {}, reports {}, ending '{}'): {} | {} | time {} trust {} attempts {}",
                    i + 1,
                    summary.strategy,
                    summary.seed,
                    metrics.turns,
                    metrics.final_phase,
                    metrics.reports.len(),
                    summary.ending_message,
                    err,
                    context,
                    metrics.time_left,
                    metrics.trust_left,
                    metrics.attempts_left
                ));
                if let Some(base) = &self.artifacts {
                    let dir = artifacts_dir(base, &scenario.name, summary.seed);
                    let failure = failures.last().map_or("", String::as_str);
                    let written = write_failure_artifacts(&dir, &summary.final_state, failure);
                    if let Err(write_err) = written {
                        log::warn!(
                            "could not write artifacts to {}: {write_err:#}",
                            dir.display()
                        );
                    }
                }

                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.clone().red()
                    );
                    println!(
                        "     ↳ Seed {} | Turns {} | Decisions: {}",
                        summary.seed, metrics.turns, context
                    );
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);

                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) phase:{} reports:{} strategy:{}",
                        i + 1,
                        iterations,
                        summary.metrics.final_phase,
                        summary.metrics.reports.len(),
                        summary.strategy
                    );
                }
            }
        }

        (successes, failures, performance_data)
    }
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(format!("{err:#}"));
        }
    }
    None
}

fn summarize_decision_path(summary: &SimulationSummary) -> String {
    if summary.metrics.decision_log.is_empty() {
        return "no decisions recorded".to_string();
    }

    summary
        .metrics
        .decision_log
        .iter()
        .rev()
        .take(3)
        .map(|entry| {
            let rationale = entry
                .rationale
                .as_deref()
                .filter(|s| !s.is_empty())
                .unwrap_or("-");
            let refused = entry
                .error
                .as_deref()
                .map(|e| format!(" refused: {e}"))
                .unwrap_or_default();
            format!(
                "turn {} {} reason {}{}",
                entry.turn, entry.action, rationale, refused
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
