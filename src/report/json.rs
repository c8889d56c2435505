use super::types::TestResults;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const RESULTS_FILE: &str = "test-results.json";

/// Write `test-results.json` into the output directory
pub fn write_report(results: &TestResults, output_dir: &Path) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(results)?;
    let path = output_dir.join(RESULTS_FILE);
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Load a previously written results file
pub fn load(path: &Path) -> Result<TestResults> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid results JSON: {}", path.display()))
}
