pub mod events;
pub mod executor;
pub mod fixtures;
pub mod preflight;
pub mod session;
pub mod state;

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::parser::types::Suite;
use crate::utils::config::RunConfig;

pub use events::*;
pub use executor::{classify, BrowserSessionFactory, Harness, SessionFactory};
pub use fixtures::FixtureData;
pub use session::{end_session, start_session, Session};
pub use state::*;

/// Run a suite against a real browser and write every report artifact.
///
/// Errors only for fatal environment problems (no browser, application not
/// answering the preflight, output directory not writable). Scenario failures
/// are part of the returned report.
pub async fn run(suite: &Suite, config: RunConfig, stop: Arc<AtomicBool>) -> Result<RunReport> {
    run_with_factory(suite, config, stop, &BrowserSessionFactory).await
}

pub async fn run_with_factory(
    suite: &Suite,
    config: RunConfig,
    stop: Arc<AtomicBool>,
    factory: &dyn SessionFactory,
) -> Result<RunReport> {
    let screenshots = config.output_dir.join("screenshots");
    std::fs::create_dir_all(&screenshots)
        .with_context(|| format!("Failed to create {}", screenshots.display()))?;

    if let Some(timeout) = config.wait_for_app {
        println!(
            "{} Waiting up to {}s for {}",
            "⏳".blue(),
            timeout.as_secs(),
            config.session.base_url.cyan()
        );
        preflight::wait_for_app(&config.session.base_url, timeout).await?;
    }

    let fixtures = FixtureData::generate(&config.session.base_url, &config.vars);
    println!(
        "{} Test email: {}",
        "ℹ".blue(),
        fixtures.get("test_email").unwrap_or_default()
    );

    let output_dir = config.output_dir.clone();
    let harness = Harness::new(config, fixtures).with_stop_flag(stop);

    let listener = tokio::spawn(ConsoleEventListener::listen(harness.subscribe()));
    let result = harness.run_suite(suite, factory).await;
    // Dropping the harness closes the channel so the listener drains and exits
    drop(harness);
    let _ = listener.await;

    let report = result?;
    crate::report::write_reports(&report, &output_dir)?;
    Ok(report)
}
