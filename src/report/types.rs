use crate::runner::state::RunReport;
use serde::{Deserialize, Serialize};

/// Contents of `test-results.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    #[serde(flatten)]
    pub report: RunReport,
    pub generated_at: String,
}

impl TestResults {
    pub fn new(report: RunReport) -> Self {
        Self {
            report,
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
