use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use casefile_game::GameState;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

pub fn artifacts_dir(base: &Path, scenario: &str, seed: u64) -> PathBuf {
    let ts = Utc::now().format("%Y%m%dT%H%M%S%3f");
    base.join(scenario).join(format!("seed-{seed}")).join(ts.to_string())
}

/// Dump the final game state and failure text of a run for later replay.
pub fn write_failure_artifacts(dir: &Path, state: &GameState, failure: &str) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let state_json = serde_json::to_vec_pretty(state).context("encoding final state")?;
    fs::write(dir.join("state.json"), state_json).context("writing state.json")?;
    fs::write(dir.join("failure.txt"), failure).context("writing failure.txt")?;
    Ok(())
}
