use super::types::TestResults;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE: &str = "summary.txt";

const RULE_WIDTH: usize = 80;

/// Plain-text run summary
pub fn render_summary(results: &TestResults) -> String {
    let report = &results.report;
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "TEST EXECUTION SUMMARY");
    let _ = writeln!(out, "{}", rule);
    if !report.info.suite.is_empty() {
        let _ = writeln!(out, "Suite: {}", report.info.suite);
    }
    if !report.info.base_url.is_empty() {
        let _ = writeln!(out, "Base URL: {}", report.info.base_url);
    }
    if !report.info.run_id.is_empty() {
        let _ = writeln!(out, "Run ID: {}", report.info.run_id);
    }
    let _ = writeln!(out, "Generated: {}", results.generated_at);
    let _ = writeln!(out, "Tests Run: {}", report.run);
    let _ = writeln!(out, "Successes: {}", report.passed);
    let _ = writeln!(out, "Failures: {}", report.failed);
    let _ = writeln!(out, "Errors: {}", report.errored);
    if report.info.interrupted {
        let _ = writeln!(out, "Interrupted: remaining scenarios were not run");
    }
    let _ = writeln!(out, "{}", rule);

    if !report.results.is_empty() {
        out.push('\n');
    }
    for result in &report.results {
        let _ = write!(
            out,
            "[{:<7}] {} ({}ms)",
            result.outcome.label(),
            result.name,
            result.duration_ms
        );
        if let Some(message) = result.outcome.message() {
            let _ = write!(out, ": {}", message);
        }
        out.push('\n');
    }

    out
}

/// Write `summary.txt` into the output directory
pub fn write_report(results: &TestResults, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(SUMMARY_FILE);
    std::fs::write(&path, render_summary(results))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
