pub mod types;
pub mod yaml;

use anyhow::Result;
use std::path::Path;

use types::Suite;

/// Built-in MediConsult catalog
pub const MEDICONSULT_SUITE: &str = include_str!("../../scenarios/mediconsult.yaml");

/// Load the built-in catalog
pub fn builtin_suite() -> Result<Suite> {
    yaml::parse_suite_content(MEDICONSULT_SUITE)
}

/// Load a suite file, or every `.yaml`/`.yml` suite under a directory
/// (sorted by path, scenarios concatenated in that order).
pub fn load_suites(path: &Path) -> Result<Suite> {
    if !path.is_dir() {
        return yaml::parse_suite_file(path);
    }

    let mut files: Vec<_> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map_or(false, |ext| ext == "yaml" || ext == "yml")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No suite files found under {}", path.display());
    }

    let mut merged: Option<Suite> = None;
    for file in files {
        let suite = yaml::parse_suite_file(&file)?;
        match merged.as_mut() {
            None => merged = Some(suite),
            Some(acc) => {
                for scenario in suite.scenarios {
                    if acc.scenarios.iter().any(|s| s.name == scenario.name) {
                        anyhow::bail!(
                            "Duplicate scenario name '{}' in {}",
                            scenario.name,
                            file.display()
                        );
                    }
                    acc.scenarios.push(scenario);
                }
            }
        }
    }

    merged.ok_or_else(|| anyhow::anyhow!("No suites loaded from {}", path.display()))
}
