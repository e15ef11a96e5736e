use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::{PlayabilityAggregate, PlayabilityRecord, ScenarioResult};

pub fn generate_console_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
    aggregates: &[PlayabilityAggregate],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    let title = "📊 Logic Test Results Summary".bright_cyan().bold();
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    let success_rate = success_rate(passed_tests, total_tests);
    writeln!(out, "Success rate: {success_rate:.1}%")?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    if let (Some(fastest), Some(slowest)) = (
        results.iter().min_by_key(|r| r.average_duration),
        results.iter().max_by_key(|r| r.average_duration),
    ) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
        writeln!(out)?;
    }

    if !aggregates.is_empty() {
        let title = "🕵️ Playability Summary".bright_magenta().bold();
        writeln!(out, "{title}")?;
        writeln!(out, "{}", "======================".magenta())?;
        writeln!(
            out,
            "{:<10} {:>5} {:>7} {:>7} {:>7} {:>8} {:>7} {:>7} {:>6}",
            "strategy", "runs", "solved", "failed", "stalled", "reports", "score", "trust", "guards"
        )?;
        for agg in aggregates {
            writeln!(
                out,
                "{:<10} {:>5} {:>6.1}% {:>6.1}% {:>6.1}% {:>8.2} {:>7.1} {:>7.1} {:>6.2}",
                agg.scenario_name,
                agg.iterations,
                agg.solve_pct * 100.0,
                agg.fail_pct * 100.0,
                agg.stall_pct * 100.0,
                agg.mean_reports,
                agg.mean_final_score,
                agg.mean_trust_left,
                agg.mean_guard_hits
            )?;
        }
    }
    Ok(())
}

pub fn generate_json_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report<W: Write + ?Sized>(
    out: &mut W,
    results: &[ScenarioResult],
) -> Result<()> {
    writeln!(out, "# Casefile Logic Test Results\n")?;
    writeln!(
        out,
        "_Generated {}_\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    let success_rate = success_rate(passed_tests, total_tests);
    writeln!(out, "- **Success rate**: {success_rate:.1}%\n")?;

    writeln!(out, "## Detailed Results\n")?;

    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(
            out,
            "### {status} {} (seed {})\n",
            result.scenario_name, result.seed
        )?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

const CSV_COLUMNS: [&str; 15] = [
    "scenario",
    "strategy",
    "seed_code",
    "seed_value",
    "final_phase",
    "reports",
    "first_outcome",
    "final_score",
    "turns",
    "investigations",
    "guard_hits",
    "refused_actions",
    "time_left",
    "trust_left",
    "attempts_left",
];

/// One row per playability run.
pub fn generate_csv_report<W: Write + ?Sized>(
    out: &mut W,
    records: &[PlayabilityRecord],
) -> Result<()> {
    writeln!(out, "{}", CSV_COLUMNS.join(","))?;
    for record in records {
        let metrics = &record.metrics;
        let first_outcome = metrics.first_outcome().map_or("", |o| o.as_str());
        let final_score = metrics
            .last_report()
            .map(|r| r.score_percent.to_string())
            .unwrap_or_default();
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&record.scenario_name),
            record.strategy.label(),
            csv_field(&record.seed_code),
            record.seed_value,
            metrics.final_phase.as_str(),
            metrics.reports.len(),
            first_outcome,
            final_score,
            metrics.turns,
            metrics.investigations,
            metrics.guard_hits,
            metrics.refused_actions,
            metrics.time_left,
            metrics.trust_left,
            metrics.attempts_left
        )?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / total as f64) * 100.0;
    rate
}
