mod logic;
mod scenario;
mod util;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use casefile_game::GradingConfig;
use logic::{
    DEFAULT_CASE_ID, GameTester, LogicTester, PlayabilityAggregate, PlayabilityRecord,
    ScenarioResult, SeedInfo, TesterAssets, aggregate_playability, reports, resolve_seed_inputs,
    run_playability_analysis, validate_playability_targets,
};
use scenario::{get_scenario, list_scenarios, scenario_keys};
use util::split_csv;

/// Minimum sweep length per strategy when balance targets are enforced.
const ACCEPTANCE_ITERATIONS: usize = 100;

/// Layout of the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    /// Colored summary with the playability table
    Console,
    /// Scenario results as a JSON array
    Json,
    /// Scenario results as a Markdown document
    Markdown,
    /// One row per playability run
    Csv,
}

impl ReportFormat {
    const fn needs_sweep(self) -> bool {
        matches!(self, Self::Console | Self::Csv)
    }

    const fn shows_total_time(self) -> bool {
        matches!(self, Self::Console | Self::Markdown)
    }
}

#[derive(Debug, Parser)]
#[command(name = "casefile-tester", version)]
#[command(about = "Scripted report scenarios and seeded playability sweeps for Casefile")]
struct Args {
    /// Scenarios to run (comma-separated, `all` for the whole catalog)
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// Print the scenario catalog and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated; integers, 0x hex or `phrase:<text>`)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Iterations per scenario and seed, also the sweep length per strategy
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Enforce balance targets over a sweep of at least 100 runs per strategy
    #[arg(long)]
    acceptance: bool,

    /// Bundled case to play
    #[arg(long, default_value = DEFAULT_CASE_ID)]
    case: String,

    /// JSON file overriding the grading rules
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for final-state dumps of failing iterations
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,
}

/// Scenarios, seeds and sweep length resolved from the command line.
#[derive(Debug)]
struct RunPlan {
    scenarios: Vec<String>,
    seeds: Vec<SeedInfo>,
    sweep_iterations: usize,
}

impl RunPlan {
    fn from_args(args: &Args) -> Result<Self> {
        let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
        Ok(Self {
            scenarios: select_scenarios(&args.scenarios),
            seeds,
            sweep_iterations: sweep_iterations(args.iterations, args.acceptance),
        })
    }

    fn logic_seeds(&self) -> Vec<u64> {
        self.seeds.iter().map(|s| s.seed).collect()
    }
}

/// Records and per-strategy aggregates of one playability sweep.
struct Sweep {
    records: Vec<PlayabilityRecord>,
    aggregates: Vec<PlayabilityAggregate>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_scenarios {
        let mut out = open_output(args.output.as_deref())?;
        write_catalog(&mut out)?;
        out.flush()?;
        return Ok(());
    }

    announce_banner();

    let start_time = Instant::now();
    let plan = RunPlan::from_args(&args)?;
    let config = load_grading_config(args.config.as_deref())?;
    let assets = Arc::new(TesterAssets::load(&args.case, config)?);
    let tester = GameTester::new(assets, args.verbose);

    let results = run_scenarios(&args, &plan, &tester);
    let sweep = run_sweep(&args, &plan, &tester)?;

    let elapsed = start_time.elapsed();
    let mut out = open_output(args.output.as_deref())?;
    write_report(&mut out, args.report, &results, sweep.as_ref(), elapsed)?;
    out.flush()?;
    drop(out);

    if args.acceptance {
        let sweep = sweep.as_ref().context("acceptance sweep did not run")?;
        validate_playability_targets(&sweep.aggregates, &sweep.records)?;
    }

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn announce_banner() {
    println!("{}", "🕵️ Casefile Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

/// Buffered writer for `path`, or for stdout when no path is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(stdout().lock())));
    };
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn write_catalog(out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(out, "  {key:<22} {description}")?;
    }
    Ok(())
}

fn load_grading_config(path: Option<&Path>) -> Result<GradingConfig> {
    let Some(path) = path else {
        return Ok(GradingConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = GradingConfig::from_json(&raw)
        .with_context(|| format!("invalid grading config in {}", path.display()))?;
    log::info!("grading rules loaded from {}", path.display());
    Ok(config)
}

/// Acceptance sweeps never run shorter than [`ACCEPTANCE_ITERATIONS`].
fn sweep_iterations(requested: usize, acceptance: bool) -> usize {
    if !acceptance {
        return requested;
    }
    let iterations = requested.max(ACCEPTANCE_ITERATIONS);
    println!("🔁 Acceptance sweep: {iterations} playability iterations per strategy");
    iterations
}

/// Scenario keys in command-line order, `all` expanded in place, repeats dropped.
fn select_scenarios(raw: &str) -> Vec<String> {
    let mut selected: Vec<String> = Vec::new();
    for token in split_csv(raw) {
        let keys = if token == "all" {
            scenario_keys()
        } else {
            vec![token]
        };
        for key in keys {
            if !selected.contains(&key) {
                selected.push(key);
            }
        }
    }
    selected
}

fn run_scenarios(args: &Args, plan: &RunPlan, tester: &GameTester) -> Vec<ScenarioResult> {
    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let artifacts = args.artifacts_dir.clone();
    let runner = LogicTester::new(tester.clone(), args.verbose).with_artifacts(artifacts);
    let seeds = plan.logic_seeds();
    plan.scenarios
        .iter()
        .filter_map(|name| {
            let scenario = get_scenario(name);
            if scenario.is_none() {
                eprintln!("⚠️  Unknown scenario: {}", name.yellow());
            }
            scenario
        })
        .flat_map(|scenario| runner.run_scenario(&scenario, &seeds, args.iterations))
        .collect()
}

/// The sweep only runs when its output is shown or its targets are enforced.
fn run_sweep(args: &Args, plan: &RunPlan, tester: &GameTester) -> Result<Option<Sweep>> {
    if !args.acceptance && !args.report.needs_sweep() {
        return Ok(None);
    }
    let records = run_playability_analysis(tester, &plan.seeds, plan.sweep_iterations)?;
    let aggregates = aggregate_playability(&records);
    Ok(Some(Sweep {
        records,
        aggregates,
    }))
}

fn write_report(
    out: &mut dyn Write,
    format: ReportFormat,
    results: &[ScenarioResult],
    sweep: Option<&Sweep>,
    elapsed: Duration,
) -> Result<()> {
    match format {
        ReportFormat::Json => reports::generate_json_report(out, results)?,
        ReportFormat::Markdown if results.is_empty() => {
            writeln!(
                out,
                "# Casefile Logic Test Results\n\n_No scenarios executed._"
            )?;
        }
        ReportFormat::Markdown => reports::generate_markdown_report(out, results)?,
        ReportFormat::Csv => match sweep {
            Some(sweep) => reports::generate_csv_report(out, &sweep.records)?,
            None => writeln!(out, "[]")?,
        },
        ReportFormat::Console if results.is_empty() => {
            writeln!(out, "No logic scenarios executed.")?;
        }
        ReportFormat::Console => match sweep {
            Some(sweep) => {
                reports::generate_console_report(out, results, &sweep.aggregates, elapsed)?;
            }
            None => writeln!(out, "Playability data unavailable.")?,
        },
    }
    if format.shows_total_time() {
        writeln!(out)?;
        writeln!(out, "🏁 Total time: {elapsed:?}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(report: ReportFormat) -> Args {
        let mut args = Args::parse_from(["casefile-tester", "--iterations", "1"]);
        args.report = report;
        args
    }

    fn plan(scenarios: &[&str], seed: u64) -> RunPlan {
        RunPlan {
            scenarios: scenarios.iter().map(ToString::to_string).collect(),
            seeds: vec![SeedInfo::from_numeric(seed)],
            sweep_iterations: 1,
        }
    }

    fn tester() -> GameTester {
        GameTester::try_new(false).unwrap()
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("casefile-{}-{name}", std::process::id()))
    }

    fn render(format: ReportFormat, results: &[ScenarioResult], sweep: Option<&Sweep>) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, format, results, sweep, Duration::from_millis(5)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn failed_result() -> ScenarioResult {
        ScenarioResult {
            scenario_name: "decoy-trap".to_string(),
            seed: 7,
            passed: false,
            iterations_run: 2,
            successful_iterations: 1,
            failures: vec!["Iteration 2: expected phase failed".to_string()],
            average_duration: Duration::from_millis(4),
            performance_data: vec![Duration::from_millis(4); 2],
        }
    }

    #[test]
    fn cli_defaults_parse() {
        let parsed = Args::parse_from(["casefile-tester"]);
        assert_eq!(parsed.report, ReportFormat::Console);
        assert_eq!(parsed.case, DEFAULT_CASE_ID);
        let csv = Args::parse_from(["casefile-tester", "--report", "csv"]);
        assert_eq!(csv.report, ReportFormat::Csv);
        assert!(Args::try_parse_from(["casefile-tester", "--report", "xml"]).is_err());
    }

    #[test]
    fn acceptance_lengthens_short_sweeps_only() {
        assert_eq!(sweep_iterations(10, false), 10);
        assert_eq!(sweep_iterations(10, true), ACCEPTANCE_ITERATIONS);
        assert_eq!(sweep_iterations(250, true), 250);
    }

    #[test]
    fn all_expands_in_place_without_repeats() {
        let keys = scenario_keys();
        let selected = select_scenarios("report-guards, all,smoke");
        assert_eq!(selected[0], "report-guards");
        assert_eq!(selected.len(), keys.len());
        assert_eq!(select_scenarios("smoke,smoke"), vec!["smoke".to_string()]);
        assert!(select_scenarios(" , ").is_empty());
    }

    #[test]
    fn run_plan_resolves_seed_tokens() {
        let mut parsed = args(ReportFormat::Json);
        parsed.seeds = "7, phrase:late invoices".to_string();
        let plan = RunPlan::from_args(&parsed).unwrap();
        assert_eq!(plan.logic_seeds().len(), 2);
        assert_eq!(plan.logic_seeds()[0], 7);

        parsed.seeds = "not-a-seed".to_string();
        assert!(RunPlan::from_args(&parsed).is_err());
    }

    #[test]
    fn unknown_scenarios_are_skipped() {
        let parsed = args(ReportFormat::Json);
        let plan = plan(&["smoke", "no-such-scenario"], 42);
        let results = run_scenarios(&parsed, &plan, &tester());
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
    }

    #[test]
    fn sweep_runs_only_when_needed() {
        let plan = plan(&[], 42);
        let json = run_sweep(&args(ReportFormat::Json), &plan, &tester()).unwrap();
        assert!(json.is_none());

        let sweep = run_sweep(&args(ReportFormat::Csv), &plan, &tester())
            .unwrap()
            .unwrap();
        assert_eq!(sweep.records.len(), 5);
        assert_eq!(sweep.aggregates.len(), 5);

        let mut acceptance = args(ReportFormat::Markdown);
        acceptance.acceptance = true;
        assert!(run_sweep(&acceptance, &plan, &tester()).unwrap().is_some());
    }

    #[test]
    fn grading_config_loads_from_file() {
        assert_eq!(load_grading_config(None).unwrap(), GradingConfig::default());
        let path = temp_file("config.json");
        std::fs::write(&path, r#"{"attempts": 5}"#).unwrap();
        let config = load_grading_config(Some(&path)).unwrap();
        assert_eq!(config.attempts, 5);
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_grading_config(Some(&path)).is_err());
        let _ = std::fs::remove_file(&path);
        assert!(load_grading_config(Some(&path)).is_err());
    }

    #[test]
    fn catalog_lists_every_key() {
        let mut buf = Vec::new();
        write_catalog(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("Available scenarios:"));
        for key in scenario_keys() {
            assert!(text.contains(&key), "{key} not listed");
        }
    }

    #[test]
    fn empty_runs_still_produce_a_report() {
        assert_eq!(render(ReportFormat::Json, &[], None).trim(), "[]");
        assert_eq!(render(ReportFormat::Csv, &[], None).trim(), "[]");
        let markdown = render(ReportFormat::Markdown, &[], None);
        assert!(markdown.contains("_No scenarios executed._"));
        assert!(markdown.contains("Total time"));
        let console = render(ReportFormat::Console, &[], None);
        assert!(console.starts_with("No logic scenarios executed."));
    }

    #[test]
    fn reports_carry_scenario_failures() {
        colored::control::set_override(false);
        let results = [failed_result()];
        let markdown = render(ReportFormat::Markdown, &results, None);
        assert!(markdown.contains("- Iteration 2: expected phase failed"));

        let console = render(ReportFormat::Console, &results, None);
        assert!(console.contains("Playability data unavailable"));

        let json: serde_json::Value =
            serde_json::from_str(&render(ReportFormat::Json, &results, None)).unwrap();
        assert_eq!(json[0]["passed"], false);
    }

    #[test]
    fn csv_report_comes_from_the_sweep() {
        let seeds = [SeedInfo::from_numeric(3)];
        let records = run_playability_analysis(&tester(), &seeds, 1).unwrap();
        let sweep = Sweep {
            aggregates: aggregate_playability(&records),
            records,
        };
        let csv = render(ReportFormat::Csv, &[], Some(&sweep));
        assert!(csv.starts_with("scenario,strategy"));
        assert_eq!(csv.lines().count(), 1 + sweep.records.len());
        assert!(!csv.contains("Total time"));
    }

    #[test]
    fn output_file_receives_buffered_writes() {
        let path = temp_file("output.txt");
        let mut out = open_output(Some(&path)).unwrap();
        write_catalog(&mut out).unwrap();
        out.flush().unwrap();
        drop(out);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("noisy-review"));
        let _ = std::fs::remove_file(&path);
        assert!(open_output(Some(Path::new("/nonexistent-dir/report.txt"))).is_err());
    }
}
