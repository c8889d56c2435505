use super::state::Outcome;
use tokio::sync::broadcast;

/// Harness execution events for real-time console output
#[derive(Debug, Clone)]
pub enum TestEvent {
    // Run events
    RunStarted {
        run_id: String,
        suite: String,
        base_url: String,
        scenario_count: usize,
    },
    RunFinished {
        run: u32,
        passed: u32,
        failed: u32,
        errored: u32,
        duration_ms: u64,
    },

    // Scenario events
    ScenarioStarted {
        name: String,
        description: String,
        step_count: usize,
    },
    ScenarioFinished {
        name: String,
        outcome: Outcome,
        duration_ms: u64,
    },

    // Step events
    StepStarted {
        index: usize,
        step: String,
        depth: usize,
    },
    StepPassed {
        duration_ms: u64,
        depth: usize,
    },
    StepFailed {
        error: String,
        duration_ms: u64,
        depth: usize,
    },
    StepSkipped {
        reason: String,
        depth: usize,
    },

    // Log event for coordinated output
    Log {
        message: String,
        depth: usize,
    },
}

/// Event emitter for broadcasting harness events
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Hidden draw target when piped, so CI logs carry no escape codes
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        // One spinner per nesting depth (repeat blocks nest)
        let mut spinners: Vec<Option<ProgressBar>> = Vec::new();
        let mut step_texts: Vec<String> = Vec::new();

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::debug!("console listener skipped {} events", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                TestEvent::RunStarted {
                    run_id,
                    suite,
                    base_url,
                    scenario_count,
                } => {
                    println!(
                        "\n{} {} ({} scenarios) against {}",
                        "▶".green().bold(),
                        suite.white().bold(),
                        scenario_count,
                        base_url.cyan()
                    );
                    println!("  Run: {}", run_id.dimmed());
                }

                TestEvent::RunFinished {
                    run,
                    passed,
                    failed,
                    errored,
                    duration_ms,
                } => {
                    for pb in spinners.drain(..).flatten() {
                        pb.finish();
                    }

                    println!("\n{} Run finished", "■".blue().bold());
                    println!("  Scenarios run: {}", run);
                    println!(
                        "  {} passed, {} failed, {} errored",
                        passed.to_string().green(),
                        failed.to_string().red(),
                        errored.to_string().yellow()
                    );
                    println!("  Duration: {}ms", duration_ms);
                }

                TestEvent::ScenarioStarted {
                    name,
                    description,
                    step_count,
                } => {
                    println!(
                        "\n  {} {} ({} steps)",
                        "→".blue(),
                        name.white().bold(),
                        step_count
                    );
                    if !description.is_empty() {
                        println!("    {}", description.dimmed());
                    }
                }

                TestEvent::ScenarioFinished {
                    name,
                    outcome,
                    duration_ms,
                } => {
                    for pb in spinners.iter_mut().filter_map(Option::take) {
                        pb.finish();
                    }

                    let status = match &outcome {
                        Outcome::Passed => outcome.label().green().bold(),
                        Outcome::Failed { .. } => outcome.label().red().bold(),
                        Outcome::Errored { .. } => outcome.label().yellow().bold(),
                    };
                    println!("  {} {} [{}] {}ms", "←".blue(), name, status, duration_ms);
                    if let Some(message) = outcome.message() {
                        println!("    {}", message.red());
                    }
                }

                TestEvent::StepStarted { index, step, depth } => {
                    if depth >= spinners.len() {
                        spinners.resize(depth + 1, None);
                        step_texts.resize(depth + 1, String::new());
                    }

                    let pb = multi.add(ProgressBar::new_spinner());
                    let indent = "    ".repeat(depth);
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template(&format!("{}    {{spinner}} {{msg}}", indent))
                    {
                        pb.set_style(style);
                    }

                    let body = format!("[{}] {}... ", index, step.dimmed());
                    pb.set_message(body.clone());
                    pb.enable_steady_tick(StdDuration::from_millis(100));

                    spinners[depth] = Some(pb);
                    step_texts[depth] = body;
                }

                TestEvent::StepPassed { duration_ms, depth } => {
                    if depth < spinners.len() {
                        let indent = "    ".repeat(depth);
                        if let Some(pb) = spinners[depth].take() {
                            pb.finish_and_clear();
                        }
                        println!(
                            "{}    {} {}({}ms)",
                            indent,
                            "✓".green(),
                            step_texts[depth],
                            duration_ms
                        );
                    }
                }

                TestEvent::StepFailed {
                    error,
                    duration_ms,
                    depth,
                } => {
                    if depth < spinners.len() {
                        let indent = "    ".repeat(depth);
                        if let Some(pb) = spinners[depth].take() {
                            pb.finish_and_clear();
                        }
                        println!(
                            "{}    {} {}({}ms)",
                            indent,
                            "✗".red(),
                            step_texts[depth],
                            duration_ms
                        );
                        println!("{}      {}", indent, error.red());
                    }
                }

                TestEvent::StepSkipped { reason, depth } => {
                    if depth < spinners.len() {
                        let indent = "    ".repeat(depth);
                        if let Some(pb) = spinners[depth].take() {
                            pb.finish_and_clear();
                        }
                        println!(
                            "{}    {} {}({})",
                            indent,
                            "○".yellow(),
                            step_texts[depth],
                            reason.dimmed()
                        );
                    }
                }

                TestEvent::Log { message, depth } => {
                    let indent = "    ".repeat(depth);
                    multi.println(format!("{}      {}", indent, message)).ok();
                }
            }
        }
    }
}
