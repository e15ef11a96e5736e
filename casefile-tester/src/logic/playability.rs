use anyhow::{Context, Result, ensure};
use std::collections::BTreeMap;

use casefile_game::Phase;

use crate::logic::seeds::SeedInfo;
use crate::logic::{GameTester, GameplayStrategy, PlayabilityMetrics, SimulationPlan};

#[derive(Debug, Clone)]
pub struct PlayabilityRecord {
    pub scenario_name: String,
    pub strategy: GameplayStrategy,
    pub seed_code: String,
    pub seed_value: u64,
    pub metrics: PlayabilityMetrics,
}

#[derive(Debug, Clone)]
pub struct PlayabilityAggregate {
    pub scenario_name: String,
    pub strategy: GameplayStrategy,
    pub iterations: usize,
    pub solve_pct: f64,
    pub fail_pct: f64,
    pub stall_pct: f64,
    pub mean_reports: f64,
    pub mean_final_score: f64,
    pub std_final_score: f64,
    pub mean_turns: f64,
    pub mean_time_left: f64,
    pub mean_trust_left: f64,
    pub mean_guard_hits: f64,
    pub trap_report_rate: f64,
    pub first_report_accept_pct: f64,
}

pub fn run_playability_analysis(
    tester: &GameTester,
    seeds: &[SeedInfo],
    iterations: usize,
) -> Result<Vec<PlayabilityRecord>> {
    run_playability_analysis_with(tester, seeds, iterations, SimulationPlan::new)
}

fn run_playability_analysis_with<F>(
    tester: &GameTester,
    seeds: &[SeedInfo],
    iterations: usize,
    mut plan_builder: F,
) -> Result<Vec<PlayabilityRecord>>
where
    F: FnMut(GameplayStrategy) -> SimulationPlan,
{
    let iterations = iterations.max(1);
    let mut records =
        Vec::with_capacity(seeds.len() * GameplayStrategy::ALL.len() * iterations);

    for strategy in GameplayStrategy::ALL {
        for seed in seeds {
            for iteration in 0..iterations {
                let iteration_offset = u64::try_from(iteration).unwrap_or(0);
                let iteration_seed = seed.seed.wrapping_add(iteration_offset);
                let plan = plan_builder(strategy);
                let summary = tester.run_plan(&plan, iteration_seed);
                let context = format!(
                    "Playability expectation failed for {strategy} seed {} (iteration {})",
                    seed.seed,
                    iteration + 1
                );
                for expectation in &plan.expectations {
                    expectation
                        .evaluate(&summary)
                        .with_context(|| context.clone())?;
                }

                let seed_code = if iteration == 0 {
                    seed.label()
                } else {
                    iteration_seed.to_string()
                };

                records.push(PlayabilityRecord {
                    scenario_name: strategy.label().to_string(),
                    strategy,
                    seed_code,
                    seed_value: iteration_seed,
                    metrics: summary.metrics,
                });
            }
        }
    }

    Ok(records)
}

pub fn aggregate_playability(records: &[PlayabilityRecord]) -> Vec<PlayabilityAggregate> {
    let mut aggregates: BTreeMap<GameplayStrategy, AggregateBuilder> = BTreeMap::new();

    for record in records {
        let entry = aggregates
            .entry(record.strategy)
            .or_insert_with(|| AggregateBuilder::new(record));
        entry.ingest(&record.metrics);
        if record.metrics.refused_actions > 0 {
            log::warn!(
                "{} seed {} had {} refused actions",
                record.scenario_name,
                record.seed_code,
                record.metrics.refused_actions
            );
        }
    }

    aggregates
        .into_values()
        .map(AggregateBuilder::finish)
        .collect()
}

/// Balance targets the built-in strategies must hit.
pub fn validate_playability_targets(
    aggregates: &[PlayabilityAggregate],
    records: &[PlayabilityRecord],
) -> Result<()> {
    ensure!(!records.is_empty(), "no playability records collected");
    for aggregate in aggregates {
        let name = &aggregate.scenario_name;
        ensure!(
            aggregate.stall_pct <= f64::EPSILON,
            "{name}: {:.1}% of runs never reached an ending",
            aggregate.stall_pct * 100.0
        );
        match aggregate.strategy {
            GameplayStrategy::Careful => {
                ensure!(
                    aggregate.solve_pct >= 1.0,
                    "{name}: careful play must always solve the case"
                );
                ensure!(
                    (aggregate.mean_final_score - 100.0).abs() <= f64::EPSILON,
                    "{name}: careful play must score 100, averaged {:.1}",
                    aggregate.mean_final_score
                );
            }
            GameplayStrategy::Padded => {
                ensure!(
                    aggregate.solve_pct >= 1.0,
                    "{name}: padded play should recover after review"
                );
                ensure!(
                    aggregate.first_report_accept_pct <= f64::EPSILON,
                    "{name}: padded first reports should never be accepted outright"
                );
            }
            GameplayStrategy::Gullible => {
                ensure!(
                    aggregate.fail_pct >= 1.0,
                    "{name}: decoy answers must never be accepted"
                );
                ensure!(
                    aggregate.trap_report_rate >= 1.0,
                    "{name}: every decoy report must be flagged"
                );
            }
            GameplayStrategy::Hasty => {
                ensure!(
                    (aggregate.mean_guard_hits - 2.0).abs() <= f64::EPSILON,
                    "{name}: expected two guard hits per run, averaged {:.2}",
                    aggregate.mean_guard_hits
                );
            }
            GameplayStrategy::Random => {}
        }
    }
    validate_replay_determinism(records)?;
    Ok(())
}

/// Runs sharing a strategy and seed must produce identical metrics.
fn validate_replay_determinism(records: &[PlayabilityRecord]) -> Result<()> {
    let mut seen: BTreeMap<(GameplayStrategy, u64), &PlayabilityMetrics> = BTreeMap::new();
    for record in records {
        if let Some(previous) = seen.insert((record.strategy, record.seed_value), &record.metrics) {
            ensure!(
                previous == &record.metrics,
                "{} seed {} diverged between replays",
                record.scenario_name,
                record.seed_value
            );
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct AggregateBuilder {
    scenario_name: String,
    strategy: GameplayStrategy,
    stats_score: RunningStats,
    stats_turns: RunningStats,
    iterations: u32,
    solved: u32,
    failed: u32,
    stalled: u32,
    reports_sum: u32,
    trap_reports: u32,
    first_accepted: u32,
    time_left_sum: f64,
    trust_left_sum: f64,
    guard_hit_sum: u32,
}

impl AggregateBuilder {
    fn new(record: &PlayabilityRecord) -> Self {
        Self {
            scenario_name: record.scenario_name.clone(),
            strategy: record.strategy,
            stats_score: RunningStats::default(),
            stats_turns: RunningStats::default(),
            iterations: 0,
            solved: 0,
            failed: 0,
            stalled: 0,
            reports_sum: 0,
            trap_reports: 0,
            first_accepted: 0,
            time_left_sum: 0.0,
            trust_left_sum: 0.0,
            guard_hit_sum: 0,
        }
    }

    fn ingest(&mut self, metrics: &PlayabilityMetrics) {
        self.iterations += 1;
        match metrics.final_phase {
            Phase::Solved => self.solved += 1,
            Phase::Failed => self.failed += 1,
            Phase::Briefing | Phase::Playing => self.stalled += 1,
        }
        if let Some(report) = metrics.last_report() {
            self.stats_score.add(f64::from(report.score_percent));
        }
        self.stats_turns.add(f64::from(metrics.turns));
        let reports = u32::try_from(metrics.reports.len()).unwrap_or(u32::MAX);
        self.reports_sum = self.reports_sum.saturating_add(reports);
        let traps = metrics.reports.iter().filter(|r| r.trap_steps > 0).count();
        self.trap_reports = self
            .trap_reports
            .saturating_add(u32::try_from(traps).unwrap_or(u32::MAX));
        if metrics.first_outcome() == Some(casefile_game::ReportOutcome::Accepted) {
            self.first_accepted += 1;
        }
        self.time_left_sum += f64::from(metrics.time_left);
        self.trust_left_sum += f64::from(metrics.trust_left);
        self.guard_hit_sum = self.guard_hit_sum.saturating_add(metrics.guard_hits);
    }

    fn finish(self) -> PlayabilityAggregate {
        let iterations_u32 = self.iterations.max(1);
        let iterations = usize::try_from(self.iterations).unwrap_or(usize::MAX);
        let denom = f64::from(iterations_u32);
        PlayabilityAggregate {
            scenario_name: self.scenario_name,
            strategy: self.strategy,
            iterations,
            solve_pct: f64::from(self.solved) / denom,
            fail_pct: f64::from(self.failed) / denom,
            stall_pct: f64::from(self.stalled) / denom,
            mean_reports: f64::from(self.reports_sum) / denom,
            mean_final_score: self.stats_score.mean(),
            std_final_score: self.stats_score.std_dev(),
            mean_turns: self.stats_turns.mean(),
            mean_time_left: self.time_left_sum / denom,
            mean_trust_left: self.trust_left_sum / denom,
            mean_guard_hits: f64::from(self.guard_hit_sum) / denom,
            trap_report_rate: if self.reports_sum == 0 {
                0.0
            } else {
                f64::from(self.trap_reports) / f64::from(self.reports_sum)
            },
            first_report_accept_pct: f64::from(self.first_accepted) / denom,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: u32,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let count = f64::from(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / f64::from(self.count - 1)
        } else {
            0.0
        }
    }

    fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::SimulationSummary;

    fn tester() -> GameTester {
        GameTester::try_new(false).unwrap()
    }

    fn seeds() -> Vec<SeedInfo> {
        vec![SeedInfo::from_numeric(1337), SeedInfo::from_numeric(7)]
    }

    #[test]
    fn generates_records_for_each_strategy() {
        let records = run_playability_analysis(&tester(), &seeds(), 2).unwrap();
        assert_eq!(records.len(), GameplayStrategy::ALL.len() * 2 * 2);
        assert_eq!(records[0].seed_code, "1337");
        assert_eq!(records[1].seed_code, "1338");
    }

    #[test]
    fn aggregates_match_record_counts() {
        let records = run_playability_analysis(&tester(), &seeds(), 3).unwrap();
        let aggregates = aggregate_playability(&records);
        assert_eq!(aggregates.len(), GameplayStrategy::ALL.len());
        for aggregate in &aggregates {
            assert_eq!(aggregate.iterations, 6);
            let total = aggregate.solve_pct + aggregate.fail_pct + aggregate.stall_pct;
            assert!((total - 1.0).abs() < 1e-9);
        }
        validate_playability_targets(&aggregates, &records).unwrap();
    }

    #[test]
    fn failing_expectation_stops_the_sweep() {
        let err = run_playability_analysis_with(&tester(), &seeds(), 1, |strategy| {
            SimulationPlan::new(strategy).with_expectation(|summary: &SimulationSummary| {
                anyhow::ensure!(summary.strategy != GameplayStrategy::Gullible, "gullible");
                Ok(())
            })
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("strategy Gullible"));
    }

    #[test]
    fn careful_target_rejects_imperfect_scores() {
        let records = run_playability_analysis(&tester(), &seeds(), 1).unwrap();
        let mut aggregates = aggregate_playability(&records);
        let careful = aggregates
            .iter_mut()
            .find(|a| a.strategy == GameplayStrategy::Careful)
            .unwrap();
        careful.mean_final_score = 90.0;
        assert!(validate_playability_targets(&aggregates, &records).is_err());
    }

    #[test]
    fn diverging_replays_are_detected() {
        let mut records = run_playability_analysis(&tester(), &seeds(), 1).unwrap();
        let mut copy = records[0].clone();
        copy.metrics.turns += 1;
        records.push(copy);
        assert!(validate_replay_determinism(&records).is_err());
    }

    #[test]
    fn running_stats_mean_and_spread() {
        let mut stats = RunningStats::default();
        assert!(stats.mean().abs() < f64::EPSILON);
        for value in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(value);
        }
        assert!((stats.mean() - 5.0).abs() < 1e-9);
        assert!((stats.variance() - 32.0 / 7.0).abs() < 1e-9);
    }
}
