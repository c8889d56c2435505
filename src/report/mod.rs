pub mod json;
pub mod junit;
pub mod text;
pub mod types;

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::runner::state::RunReport;
use types::TestResults;

/// Write every run artifact (summary, JSON results, JUnit XML)
pub fn write_reports(report: &RunReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let results = TestResults::new(report.clone());
    let paths = vec![
        text::write_report(&results, output_dir)?,
        json::write_report(&results, output_dir)?,
        junit::write_report(&results, output_dir)?,
    ];

    for path in &paths {
        println!(
            "{} Report saved to: {}",
            "📄".blue(),
            path.display().to_string().cyan()
        );
    }
    Ok(paths)
}

/// Re-render `summary.txt` and `junit.xml` from a results file
pub fn generate_report(results_path: &Path, output_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let results = json::load(results_path)?;
    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => results_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    std::fs::create_dir_all(&output_dir)?;

    Ok(vec![
        text::write_report(&results, &output_dir)?,
        junit::write_report(&results, &output_dir)?,
    ])
}
