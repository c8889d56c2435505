use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::events::{EventEmitter, TestEvent};
use super::fixtures::FixtureData;
use super::session::{start_session, Session};
use super::state::{
    summarize, FailureKind, Outcome, RunInfo, RunReport, ScenarioResult, StepReport, StepState,
};
use crate::driver::common::{contains_ignore_case, poll_until, PollConfig};
use crate::driver::locator::Locator;
use crate::error::HarnessError;
use crate::parser::types::{Scenario, Step, Suite};
use crate::utils::config::{RunConfig, SessionConfig, SessionPolicy};

/// Provisions browser sessions for a run
#[async_trait(?Send)]
pub trait SessionFactory {
    async fn start(&self, config: &SessionConfig) -> Result<Session>;
}

/// Launches a real browser for every session
pub struct BrowserSessionFactory;

#[async_trait(?Send)]
impl SessionFactory for BrowserSessionFactory {
    async fn start(&self, config: &SessionConfig) -> Result<Session> {
        start_session(config).await
    }
}

/// How a single step ended when it did not fail
enum StepDone {
    Done,
    Skipped(String),
}

/// Map a step failure to a scenario outcome
pub fn classify(error: &anyhow::Error) -> Outcome {
    let message = format!("{:#}", error);
    match error.downcast_ref::<HarnessError>() {
        Some(HarnessError::PageLoadTimeout { .. }) | Some(HarnessError::WaitTimeout { .. }) => {
            Outcome::Failed {
                kind: FailureKind::Timeout,
                message,
            }
        }
        Some(HarnessError::AssertionFailed(_)) | Some(HarnessError::ElementNotFound(_)) => {
            Outcome::Failed {
                kind: FailureKind::Assertion,
                message,
            }
        }
        _ => Outcome::Errored { message },
    }
}

/// Replace anything that is not safe in a file name
pub fn safe_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

/// Runs scenarios against sessions, one at a time
pub struct Harness {
    config: RunConfig,
    fixtures: FixtureData,
    emitter: EventEmitter,
    stop: Arc<AtomicBool>,
}

impl Harness {
    pub fn new(config: RunConfig, fixtures: FixtureData) -> Self {
        Self {
            config,
            fixtures,
            emitter: EventEmitter::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an externally owned stop flag (e.g. set from a Ctrl+C handler)
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TestEvent> {
        self.emitter.subscribe()
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.config.output_dir.join("screenshots")
    }

    fn final_screenshot_path(&self) -> PathBuf {
        self.screenshots_dir().join("final.png")
    }

    fn log(&self, message: String, depth: usize) {
        self.emitter.emit(TestEvent::Log { message, depth });
    }

    /// Scenarios selected by the `--only` and `--tags` filters, in catalog
    /// order. Names in `--only` must all exist in the suite.
    pub fn select<'a>(&self, suite: &'a Suite) -> Result<Vec<&'a Scenario>> {
        let unknown: Vec<&str> = self
            .config
            .only
            .iter()
            .filter(|name| !suite.scenarios.iter().any(|s| &s.name == *name))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            anyhow::bail!(
                "Unknown scenario(s) in suite '{}': {}",
                suite.name,
                unknown.join(", ")
            );
        }

        Ok(suite
            .scenarios
            .iter()
            .filter(|s| self.config.only.is_empty() || self.config.only.contains(&s.name))
            .filter(|s| self.config.tags.iter().all(|t| s.tags.contains(t)))
            .collect())
    }

    /// Run every selected scenario of a suite and aggregate the results.
    ///
    /// Only a session that cannot be started before any scenario ran aborts
    /// the run. Later launch failures error the affected scenario. Every
    /// session that was started is ended before this returns.
    pub async fn run_suite(&self, suite: &Suite, factory: &dyn SessionFactory) -> Result<RunReport> {
        let scenarios = self.select(suite)?;
        let started = Instant::now();
        let mut info = RunInfo {
            run_id: self.fixtures.get("run_id").unwrap_or_default(),
            suite: suite.name.clone(),
            base_url: self.config.session.base_url.clone(),
            started_at: chrono::Local::now().to_rfc3339(),
            ..RunInfo::default()
        };

        self.emitter.emit(TestEvent::RunStarted {
            run_id: info.run_id.clone(),
            suite: suite.name.clone(),
            base_url: info.base_url.clone(),
            scenario_count: scenarios.len(),
        });

        let mut results = Vec::with_capacity(scenarios.len());
        let final_path = self.final_screenshot_path();

        match self.config.session_policy {
            SessionPolicy::Shared => {
                let session = factory.start(&self.config.session).await?;
                info.browser = session.browser_name().to_string();
                for scenario in &scenarios {
                    if self.stop_requested(&mut info) {
                        break;
                    }
                    results.push(self.run_scenario(&session, scenario).await);
                }
                self.close(session, &final_path).await;
            }
            SessionPolicy::Fresh => {
                for scenario in &scenarios {
                    if self.stop_requested(&mut info) {
                        break;
                    }
                    let session = match factory.start(&self.config.session).await {
                        Ok(session) => session,
                        Err(e) if results.is_empty() => return Err(e),
                        Err(e) => {
                            log::warn!("session for {} failed to start: {:#}", scenario.name, e);
                            results.push(self.launch_failure(scenario, &e));
                            continue;
                        }
                    };
                    info.browser = session.browser_name().to_string();
                    results.push(self.run_scenario(&session, scenario).await);
                    self.close(session, &final_path).await;
                }
            }
        }

        info.duration_ms = started.elapsed().as_millis() as u64;
        let report = summarize(results).with_info(info);

        self.emitter.emit(TestEvent::RunFinished {
            run: report.run,
            passed: report.passed,
            failed: report.failed,
            errored: report.errored,
            duration_ms: report.info.duration_ms,
        });

        Ok(report)
    }

    fn stop_requested(&self, info: &mut RunInfo) -> bool {
        if self.stop.load(Ordering::SeqCst) {
            info.interrupted = true;
            self.log(
                format!("{} Interrupted, skipping remaining scenarios", "⚠".yellow()),
                0,
            );
            return true;
        }
        false
    }

    /// Result for a scenario whose session could not be started
    fn launch_failure(&self, scenario: &Scenario, error: &anyhow::Error) -> ScenarioResult {
        let outcome = Outcome::Errored {
            message: format!("session failed to start: {:#}", error),
        };
        self.emitter.emit(TestEvent::ScenarioFinished {
            name: scenario.name.clone(),
            outcome: outcome.clone(),
            duration_ms: 0,
        });
        ScenarioResult {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            tags: scenario.tags.clone(),
            outcome,
            steps: Vec::new(),
            duration_ms: 0,
            screenshot_path: None,
        }
    }

    async fn close(&self, session: Session, final_screenshot: &Path) {
        if let Err(e) = session.end(Some(final_screenshot)).await {
            log::warn!("failed to end session cleanly: {:#}", e);
        }
    }

    /// Execute one scenario. Never fails: any step error becomes the
    /// scenario's outcome.
    pub async fn run_scenario(&self, session: &Session, scenario: &Scenario) -> ScenarioResult {
        self.emitter.emit(TestEvent::ScenarioStarted {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            step_count: scenario.steps.len(),
        });
        log::info!("scenario {} started", scenario.name);

        let started = Instant::now();
        let mut states: Vec<StepState> = scenario
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| StepState::new(i, &step.display()))
            .collect();

        let mut outcome = Outcome::Passed;
        for (i, step) in scenario.steps.iter().enumerate() {
            let state = &mut states[i];
            state.start();
            self.emitter.emit(TestEvent::StepStarted {
                index: i,
                step: state.display.clone(),
                depth: 0,
            });

            match self.execute_step(session, scenario, step, 0).await {
                Ok(done) => {
                    if let Step::Screenshot(name) = step {
                        state.screenshot_path = Some(
                            self.step_screenshot_path(&scenario.name, name)
                                .display()
                                .to_string(),
                        );
                    }
                    self.finish_step(state, done, 0);
                }
                Err(e) => {
                    let error = format!("{:#}", e);
                    state.fail(error.clone());
                    self.emitter.emit(TestEvent::StepFailed {
                        error,
                        duration_ms: state.duration_ms.unwrap_or(0),
                        depth: 0,
                    });
                    outcome = classify(&e);
                    break;
                }
            }
        }

        for state in states.iter_mut().filter(|s| s.started_at.is_none()) {
            state.skip("previous step failed".to_string());
        }

        let screenshot_path = if !outcome.is_passed() && self.config.snapshot_on_failure {
            self.failure_snapshot(session, &scenario.name).await
        } else {
            None
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        log::info!("scenario {} finished: {}", scenario.name, outcome.label());
        self.emitter.emit(TestEvent::ScenarioFinished {
            name: scenario.name.clone(),
            outcome: outcome.clone(),
            duration_ms,
        });

        ScenarioResult {
            name: scenario.name.clone(),
            description: scenario.description.clone(),
            tags: scenario.tags.clone(),
            outcome,
            steps: states.iter().map(StepState::to_report).collect::<Vec<StepReport>>(),
            duration_ms,
            screenshot_path,
        }
    }

    fn finish_step(&self, state: &mut StepState, done: StepDone, depth: usize) {
        match done {
            StepDone::Done => {
                state.pass();
                self.emitter.emit(TestEvent::StepPassed {
                    duration_ms: state.duration_ms.unwrap_or(0),
                    depth,
                });
            }
            StepDone::Skipped(reason) => {
                state.skip(reason.clone());
                self.emitter.emit(TestEvent::StepSkipped { reason, depth });
            }
        }
    }

    async fn failure_snapshot(&self, session: &Session, scenario: &str) -> Option<String> {
        let path = self
            .screenshots_dir()
            .join(format!("{}_failure.png", safe_file_name(scenario)));
        match session.screenshot(&path).await {
            Ok(()) => Some(path.display().to_string()),
            Err(e) => {
                log::warn!("failure snapshot for {} not saved: {:#}", scenario, e);
                None
            }
        }
    }

    fn step_screenshot_path(&self, scenario: &str, name: &str) -> PathBuf {
        self.screenshots_dir().join(format!(
            "{}_{}.png",
            safe_file_name(scenario),
            safe_file_name(&self.fixtures.substitute(name))
        ))
    }

    /// Run nested steps (repeat bodies) with their own console lines
    fn execute_nested<'a>(
        &'a self,
        session: &'a Session,
        scenario: &'a Scenario,
        steps: &'a [Step],
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + 'a>> {
        Box::pin(async move {
            for (i, step) in steps.iter().enumerate() {
                let mut state = StepState::new(i, &step.display());
                state.start();
                self.emitter.emit(TestEvent::StepStarted {
                    index: i,
                    step: state.display.clone(),
                    depth,
                });
                match self.execute_step(session, scenario, step, depth).await {
                    Ok(done) => self.finish_step(&mut state, done, depth),
                    Err(e) => {
                        state.fail(format!("{:#}", e));
                        self.emitter.emit(TestEvent::StepFailed {
                            error: format!("{:#}", e),
                            duration_ms: state.duration_ms.unwrap_or(0),
                            depth,
                        });
                        return Err(e);
                    }
                }
            }
            Ok(())
        })
    }

    fn substitute_locator(&self, locator: &Locator) -> Locator {
        match locator {
            Locator::Text { text, role } => Locator::Text {
                text: self.fixtures.substitute(text),
                role: *role,
            },
            Locator::Role { role, name } => Locator::Role {
                role: *role,
                name: self.fixtures.substitute(name),
            },
            Locator::Label(label) => Locator::Label(self.fixtures.substitute(label)),
            Locator::Nth { .. } => locator.clone(),
        }
    }

    async fn execute_step(
        &self,
        session: &Session,
        scenario: &Scenario,
        step: &Step,
        depth: usize,
    ) -> Result<StepDone> {
        match step {
            Step::Open(target) => {
                session.open(&self.fixtures.substitute(target)).await?;
            }

            Step::AwaitReady(timeout_ms) => {
                session
                    .await_ready(timeout_ms.map(Duration::from_millis))
                    .await?;
            }

            Step::Pause(ms) => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }

            Step::TapOn { locator, optional } => {
                let locator = self.substitute_locator(locator);
                match session.locate(&locator).await? {
                    Some(element) => session.click(&element).await?,
                    None if *optional => {
                        return Ok(StepDone::Skipped(format!("{} not present", locator)));
                    }
                    None => return Err(HarnessError::ElementNotFound(locator.to_string()).into()),
                }
            }

            Step::InputText { locator, value } => {
                let locator = self.substitute_locator(locator);
                let element = session.require(&locator).await?;
                session
                    .type_text(&element, &self.fixtures.substitute(value))
                    .await?;
            }

            Step::FillInputs(values) => {
                let inputs = session.text_inputs(values.len()).await?;
                for (input, value) in inputs.iter().zip(values) {
                    session
                        .type_text(input, &self.fixtures.substitute(value))
                        .await?;
                }
            }

            Step::WaitForText {
                any_of,
                ignore_case,
                timeout_ms,
            } => {
                let texts = self.substitute_all(any_of);
                let timeout = timeout_ms.unwrap_or(session.config().implicit_wait_ms);
                let poll = PollConfig {
                    timeout_ms: timeout,
                    ..PollConfig::default()
                };
                let found = poll_until(
                    || async {
                        let content = session.content().await?;
                        Ok::<_, anyhow::Error>(first_present(&content, &texts, *ignore_case))
                    },
                    &poll,
                )
                .await?;
                if found.is_none() {
                    return Err(HarnessError::WaitTimeout {
                        condition: describe_any(&texts),
                        timeout_ms: timeout,
                    }
                    .into());
                }
            }

            Step::AssertTitle(expected) => {
                let expected = self.fixtures.substitute(expected);
                let title = session.title().await?;
                if !title.contains(&expected) {
                    return Err(HarnessError::assertion(format!(
                        "title \"{}\" does not contain \"{}\"",
                        title, expected
                    ))
                    .into());
                }
            }

            Step::AssertContains {
                any_of,
                ignore_case,
            } => {
                let texts = self.substitute_all(any_of);
                let content = session.content().await?;
                if first_present(&content, &texts, *ignore_case).is_none() {
                    return Err(HarnessError::assertion(format!(
                        "page does not contain {}",
                        describe_any(&texts)
                    ))
                    .into());
                }
            }

            Step::AssertNotContains {
                none_of,
                ignore_case,
            } => {
                let texts = self.substitute_all(none_of);
                let content = session.content().await?;
                if let Some(found) = first_present(&content, &texts, *ignore_case) {
                    return Err(HarnessError::assertion(format!(
                        "page unexpectedly contains \"{}\"",
                        found
                    ))
                    .into());
                }
            }

            Step::Screenshot(name) => {
                let path = self.step_screenshot_path(&scenario.name, name);
                session.screenshot(&path).await?;
                self.log(
                    format!("{} Saved screenshot: {}", "📸".green(), path.display()),
                    depth,
                );
            }

            Step::Repeat { times, steps } => {
                for iteration in 1..=*times {
                    self.log(
                        format!("{} Iteration {}/{}", "↻".blue(), iteration, times),
                        depth,
                    );
                    self.execute_nested(session, scenario, steps, depth + 1)
                        .await?;
                }
            }
        }

        Ok(StepDone::Done)
    }

    fn substitute_all(&self, texts: &[String]) -> Vec<String> {
        texts.iter().map(|t| self.fixtures.substitute(t)).collect()
    }
}

/// First of `texts` present in `content`
fn first_present(content: &str, texts: &[String], ignore_case: bool) -> Option<String> {
    texts
        .iter()
        .find(|t| {
            if ignore_case {
                contains_ignore_case(content, t)
            } else {
                content.contains(t.as_str())
            }
        })
        .cloned()
}

fn describe_any(texts: &[String]) -> String {
    texts
        .iter()
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(" or ")
}
