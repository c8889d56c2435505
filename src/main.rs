use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mediconsult_e2e::error::HarnessError;
use mediconsult_e2e::parser::{self, types::Suite};
use mediconsult_e2e::utils::config::{
    env_base_url, RunConfig, SessionConfig, SessionPolicy, DEFAULT_BASE_URL,
};
use mediconsult_e2e::{report, runner};

#[derive(Parser)]
#[command(name = "mediconsult-e2e")]
#[command(version = "0.1.0")]
#[command(about = "Browser-driven acceptance tests for MediConsult", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scenario catalog against a running application
    Run {
        /// Suite file or directory (built-in catalog if omitted)
        path: Option<PathBuf>,

        /// Application base URL (overrides MEDICONSULT_BASE_URL and the suite)
        #[arg(short, long)]
        base_url: Option<String>,

        /// Show the browser window
        #[arg(long, default_value = "false")]
        headed: bool,

        /// Browser executable to launch
        #[arg(long)]
        browser: Option<PathBuf>,

        /// Output directory for reports and screenshots
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Session provisioning across scenarios
        #[arg(long, value_enum, default_value = "shared")]
        session: SessionPolicy,

        /// Enable screenshot capture on failures
        #[arg(long, short = 's', default_value = "false")]
        snapshot: bool,

        /// Wait up to N seconds for the application to answer before starting
        #[arg(long)]
        wait_for_app: Option<u64>,

        /// Run only scenarios with all of these tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Option<Vec<String>>,

        /// Run only these scenarios (comma-separated names)
        #[arg(long, value_delimiter = ',')]
        only: Option<Vec<String>>,

        /// Override a fixture variable (key=value). Can be repeated.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// List the scenarios of a suite
    List {
        /// Suite file or directory (built-in catalog if omitted)
        path: Option<PathBuf>,
    },

    /// Regenerate summary and JUnit reports from test results
    Report {
        /// Path to test results JSON
        results: PathBuf,

        /// Output directory (defaults to the results file's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn load_suite(path: Option<&PathBuf>) -> anyhow::Result<Suite> {
    match path {
        Some(path) => parser::load_suites(path),
        None => parser::builtin_suite(),
    }
}

/// Exit status for a fatal error that prevented a report
fn fatal_exit_code(error: &anyhow::Error) -> i32 {
    if let Some(HarnessError::EnvironmentUnavailable(_)) = error.downcast_ref::<HarnessError>() {
        eprintln!(
            "{} Is the browser installed and the application running?",
            "ℹ".blue()
        );
    }
    2
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            fatal_exit_code(&e)
        }
    };
    std::process::exit(code);
}

async fn execute(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Run {
            path,
            base_url,
            headed,
            browser,
            output,
            session,
            snapshot,
            wait_for_app,
            tags,
            only,
            vars,
        } => {
            let suite = load_suite(path.as_ref())?;

            let base_url = base_url
                .or_else(env_base_url)
                .or_else(|| suite.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

            let mut session_config = SessionConfig {
                base_url,
                browser_executable: browser,
                ..SessionConfig::default()
            };
            if headed {
                session_config.headless = false;
            }

            let config = RunConfig {
                session: session_config,
                session_policy: session,
                output_dir: output,
                snapshot_on_failure: snapshot,
                wait_for_app: wait_for_app.map(Duration::from_secs),
                tags: tags.unwrap_or_default(),
                only: only.unwrap_or_default(),
                vars: vars.into_iter().collect::<HashMap<_, _>>(),
            };

            println!(
                "{} Running {} against {}",
                "▶".green().bold(),
                suite.name.white().bold(),
                config.session.base_url.cyan()
            );
            println!(
                "  Session: {}",
                format!("{:?}", config.session_policy).to_lowercase().cyan()
            );
            if !config.tags.is_empty() {
                println!("  Tags: {}", config.tags.join(", ").yellow());
            }
            if !config.only.is_empty() {
                println!("  Only: {}", config.only.join(", ").yellow());
            }
            println!(
                "  Output: {}",
                config.output_dir.display().to_string().cyan()
            );
            if snapshot {
                println!("  Snapshots: {}", "Enabled".green());
            }

            // Ctrl+C finishes the current scenario and still writes reports
            let stop = Arc::new(AtomicBool::new(false));
            let stop_handler = stop.clone();
            ctrlc::set_handler(move || {
                println!(
                    "\n{} Stopping after the current scenario...",
                    "⏹".yellow()
                );
                stop_handler.store(true, Ordering::SeqCst);
            })?;

            let report = runner::run(&suite, config, stop).await?;

            println!(
                "\n{} {}/{} passed ({:.1}%)",
                if report.succeeded() {
                    "✅".to_string()
                } else {
                    "❌".to_string()
                },
                report.passed,
                report.run,
                report.pass_rate()
            );
            if report.info.interrupted {
                println!("{} Run was interrupted", "⚠".yellow());
            }
            if report.run == 0 {
                println!("{} No scenarios were executed", "⚠".yellow());
            }

            Ok(if report.succeeded() { 0 } else { 1 })
        }

        Commands::List { path } => {
            let suite = load_suite(path.as_ref())?;
            println!(
                "{} {} ({} scenarios)",
                "📋".to_string().blue(),
                suite.name.white().bold(),
                suite.scenarios.len()
            );
            for (i, scenario) in suite.scenarios.iter().enumerate() {
                let tags = if scenario.tags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", scenario.tags.join(", "))
                };
                println!(
                    "  {:>2}. {}{}",
                    i + 1,
                    scenario.name.white().bold(),
                    tags.dimmed()
                );
                if !scenario.description.is_empty() {
                    println!("      {}", scenario.description);
                }
            }
            Ok(0)
        }

        Commands::Report { results, output } => {
            println!(
                "{} Generating reports from: {}",
                "📊".to_string().blue(),
                results.display()
            );
            for path in report::generate_report(&results, output.as_deref())? {
                println!(
                    "{} Report saved to: {}",
                    "📄".blue(),
                    path.display().to_string().cyan()
                );
            }
            Ok(0)
        }
    }
}
