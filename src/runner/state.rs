use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Why a scenario failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// A bounded wait elapsed (page never became ready, text never appeared)
    Timeout,
    /// Observable page state did not match expectations
    Assertion,
}

/// Final outcome of one scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed { kind: FailureKind, message: String },
    /// Unexpected driver or harness error
    Errored { message: String },
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed {
                kind: FailureKind::Timeout,
                ..
            } => "TIMEOUT",
            Outcome::Failed { .. } => "FAILED",
            Outcome::Errored { .. } => "ERROR",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed { message, .. } | Outcome::Errored { message } => Some(message),
        }
    }
}

/// Step execution status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed { error: String },
    Skipped { reason: String },
}

/// State for a single step execution
#[derive(Debug, Clone)]
pub struct StepState {
    pub index: usize,
    pub display: String,
    pub status: StepStatus,
    pub started_at: Option<Instant>,
    pub duration_ms: Option<u64>,
    pub screenshot_path: Option<String>,
}

impl StepState {
    pub fn new(index: usize, display: &str) -> Self {
        Self {
            index,
            display: display.to_string(),
            status: StepStatus::Pending,
            started_at: None,
            duration_ms: None,
            screenshot_path: None,
        }
    }

    pub fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    pub fn pass(&mut self) {
        self.finish(StepStatus::Passed);
    }

    pub fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    pub fn skip(&mut self, reason: String) {
        self.finish(StepStatus::Skipped { reason });
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    /// Serialize state for reporting (without Instant which isn't serializable)
    pub fn to_report(&self) -> StepReport {
        StepReport {
            index: self.index,
            display: self.display.clone(),
            status: self.status.clone(),
            duration_ms: self.duration_ms,
            screenshot_path: self.screenshot_path.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub index: usize,
    pub display: String,
    pub status: StepStatus,
    pub duration_ms: Option<u64>,
    pub screenshot_path: Option<String>,
}

/// Result of one executed scenario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub outcome: Outcome,
    #[serde(default)]
    pub steps: Vec<StepReport>,
    pub duration_ms: u64,
    /// Failure snapshot, when one was taken
    pub screenshot_path: Option<String>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.outcome.is_passed()
    }
}

/// Run-level metadata carried alongside the counts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub run_id: String,
    pub suite: String,
    pub base_url: String,
    pub browser: String,
    /// RFC 3339 start time
    pub started_at: String,
    pub duration_ms: u64,
    /// Set when the run was interrupted before every scenario executed
    #[serde(default)]
    pub interrupted: bool,
}

/// Aggregate view of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    #[serde(default)]
    pub info: RunInfo,
    pub run: u32,
    pub passed: u32,
    pub failed: u32,
    pub errored: u32,
    pub results: Vec<ScenarioResult>,
}

impl RunReport {
    pub fn with_info(mut self, info: RunInfo) -> Self {
        self.info = info;
        self
    }

    /// True when no executed scenario failed or errored
    pub fn all_passed(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Whether the run may report success: at least one scenario ran, none
    /// failed, and the run was not interrupted
    pub fn succeeded(&self) -> bool {
        self.run > 0 && self.all_passed() && !self.info.interrupted
    }

    /// Failures that were timeouts
    pub fn timeouts(&self) -> u32 {
        self.results
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    Outcome::Failed {
                        kind: FailureKind::Timeout,
                        ..
                    }
                )
            })
            .count() as u32
    }

    pub fn pass_rate(&self) -> f64 {
        if self.run == 0 {
            0.0
        } else {
            self.passed as f64 / self.run as f64 * 100.0
        }
    }
}

/// Fold scenario results into a report. Pure; the counts do not depend on
/// the order of `results`.
pub fn summarize(results: Vec<ScenarioResult>) -> RunReport {
    let (passed, failed, errored) =
        results
            .iter()
            .fold((0, 0, 0), |(p, f, e), result| match result.outcome {
                Outcome::Passed => (p + 1, f, e),
                Outcome::Failed { .. } => (p, f + 1, e),
                Outcome::Errored { .. } => (p, f, e + 1),
            });

    RunReport {
        info: RunInfo::default(),
        run: results.len() as u32,
        passed,
        failed,
        errored,
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, outcome: Outcome) -> ScenarioResult {
        ScenarioResult {
            name: name.to_string(),
            description: String::new(),
            tags: Vec::new(),
            outcome,
            steps: Vec::new(),
            duration_ms: 10,
            screenshot_path: None,
        }
    }

    fn failed(kind: FailureKind) -> Outcome {
        Outcome::Failed {
            kind,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_summarize_counts() {
        let report = summarize(vec![
            result("a", Outcome::Passed),
            result("b", failed(FailureKind::Assertion)),
            result("c", Outcome::Passed),
            result("d", failed(FailureKind::Timeout)),
            result(
                "e",
                Outcome::Errored {
                    message: "driver crashed".to_string(),
                },
            ),
        ]);

        assert_eq!(report.run, 5);
        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 2);
        assert_eq!(report.errored, 1);
        assert_eq!(report.timeouts(), 1);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_summarize_is_order_independent() {
        let results = vec![
            result("a", Outcome::Passed),
            result("b", failed(FailureKind::Assertion)),
            result("c", Outcome::Passed),
        ];
        let mut reversed = results.clone();
        reversed.reverse();

        let forward = summarize(results);
        let backward = summarize(reversed);
        assert_eq!(
            (forward.run, forward.passed, forward.failed, forward.errored),
            (backward.run, backward.passed, backward.failed, backward.errored)
        );
    }

    #[test]
    fn test_empty_run() {
        let report = summarize(Vec::new());
        assert_eq!(report.run, 0);
        assert!(report.all_passed());
        assert!(!report.succeeded());
        assert_eq!(report.pass_rate(), 0.0);
    }

    #[test]
    fn test_interrupted_run_does_not_succeed() {
        let passing = summarize(vec![result("a", Outcome::Passed)]);
        assert!(passing.succeeded());

        let interrupted = passing.with_info(RunInfo {
            interrupted: true,
            ..RunInfo::default()
        });
        assert!(interrupted.all_passed());
        assert!(!interrupted.succeeded());
    }

    #[test]
    fn test_step_state_lifecycle() {
        let mut step = StepState::new(0, "open /");
        assert_eq!(step.status, StepStatus::Pending);
        step.start();
        step.fail("nope".to_string());
        let report = step.to_report();
        assert_eq!(
            report.status,
            StepStatus::Failed {
                error: "nope".to_string()
            }
        );
        assert!(report.duration_ms.is_some());
    }

    #[test]
    fn test_outcome_json_shape() {
        let json = serde_json::to_value(failed(FailureKind::Timeout)).unwrap();
        assert_eq!(json["type"], "failed");
        assert_eq!(json["kind"], "timeout");
    }
}
