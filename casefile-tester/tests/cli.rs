use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "casefile-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_casefile-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("decoy-trap"));
}

#[test]
fn cli_runs_all_scenarios_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_casefile-tester");
    let output_path = temp_path("run");
    let output = Command::new(exe)
        .args([
            "--report",
            "json",
            "--scenarios",
            "all",
            "--iterations",
            "2",
            "--seeds",
            "1,phrase:late invoices",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Casefile Automated Tester"));
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output_path).expect("read report"))
            .expect("json report");
    let results = report.as_array().expect("array of results");
    assert!(results.len() >= 12);
    assert!(results.iter().all(|r| r["passed"] == true));
}

#[test]
fn cli_writes_csv_playability_rows() {
    let exe = env!("CARGO_BIN_EXE_casefile-tester");
    let output_path = temp_path("csv");
    let status = Command::new(exe)
        .args([
            "--report", "csv", "--iterations", "1", "--seeds", "99", "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert_eq!(content.lines().count(), 1 + 5);
    assert!(content.contains("Careful"));
}

#[test]
fn cli_rejects_unknown_case_and_bad_seeds() {
    let exe = env!("CARGO_BIN_EXE_casefile-tester");
    let unknown_case = Command::new(exe)
        .args([
            "--case", "case404", "--report", "json", "--iterations", "1",
        ])
        .output()
        .expect("run cli");
    assert!(!unknown_case.status.success());
    assert!(String::from_utf8_lossy(&unknown_case.stderr).contains("case404"));

    let bad_seed = Command::new(exe)
        .args(["--seeds", "not-a-seed", "--report", "json"])
        .output()
        .expect("run cli");
    assert!(!bad_seed.status.success());
}
