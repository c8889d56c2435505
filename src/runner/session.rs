use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use crate::driver::common::{poll_until, PollConfig};
use crate::driver::locator::{Locator, Role};
use crate::driver::traits::{BrowserDriver, ElementHandle};
use crate::error::HarnessError;
use crate::utils::config::SessionConfig;

const READY_STATE_JS: &str = "() => document.readyState";
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One live browser session.
///
/// Owns the driver exclusively. Dropping a session without calling
/// [`Session::end`] leaves the browser process to the driver's own cleanup,
/// so the runner always ends sessions explicitly.
pub struct Session {
    driver: Box<dyn BrowserDriver>,
    config: SessionConfig,
}

/// Launch a browser and wrap it in a session
pub async fn start_session(config: &SessionConfig) -> Result<Session> {
    log::info!(
        "starting browser session (headless={}, {}x{})",
        config.headless,
        config.window_width,
        config.window_height
    );
    let driver = crate::driver::launch(config).await?;
    Ok(Session::with_driver(driver, config.clone()))
}

/// Best-effort diagnostic screenshot, then release the browser
pub async fn end_session(session: Session, final_screenshot: Option<&Path>) -> Result<()> {
    session.end(final_screenshot).await
}

impl Session {
    pub fn with_driver(driver: Box<dyn BrowserDriver>, config: SessionConfig) -> Self {
        Self { driver, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn browser_name(&self) -> &str {
        self.driver.browser_name()
    }

    /// Navigate to a target relative to the base URL
    pub async fn open(&self, target: &str) -> Result<()> {
        let url = self.config.resolve_url(target);
        log::debug!("navigating to {}", url);
        self.driver.navigate(&url).await
    }

    /// Poll until the document reports `complete`, then let client-side
    /// rendering settle.
    pub async fn await_ready(&self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.unwrap_or_else(|| self.config.ready_timeout());
        let poll = PollConfig::fixed(timeout, READY_POLL_INTERVAL);

        let ready = poll_until(
            || async {
                let state = self.driver.evaluate(READY_STATE_JS).await?;
                Ok::<_, anyhow::Error>((state.as_str() == Some("complete")).then_some(()))
            },
            &poll,
        )
        .await?;

        if ready.is_none() {
            return Err(HarnessError::PageLoadTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }
            .into());
        }

        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
        Ok(())
    }

    /// First element whose text contains `text` (case-insensitive), honoring
    /// the implicit wait. `None` when nothing matched in time.
    pub async fn find_by_text(&self, text: &str, role: Option<Role>) -> Result<Option<ElementHandle>> {
        let locator = Locator::Text {
            text: text.to_string(),
            role,
        };
        self.locate(&locator).await
    }

    /// Resolve a locator, re-polling until the implicit wait elapses
    pub async fn locate(&self, locator: &Locator) -> Result<Option<ElementHandle>> {
        self.locate_within(locator, self.config.implicit_wait()).await
    }

    pub async fn locate_within(
        &self,
        locator: &Locator,
        wait: Duration,
    ) -> Result<Option<ElementHandle>> {
        let poll = PollConfig {
            timeout_ms: wait.as_millis() as u64,
            ..PollConfig::default()
        };
        let found = poll_until(|| locator.resolve(self.driver.as_ref()), &poll).await?;
        if found.is_none() {
            log::debug!("{} not found after {}ms", locator, poll.timeout_ms);
        }
        Ok(found)
    }

    /// Like [`Session::locate`], but absence is an error
    pub async fn require(&self, locator: &Locator) -> Result<ElementHandle> {
        self.locate(locator)
            .await?
            .ok_or_else(|| HarnessError::ElementNotFound(locator.to_string()).into())
    }

    /// Visible text-entry fields in document order, waiting until at least
    /// `min` of them are present.
    pub async fn text_inputs(&self, min: usize) -> Result<Vec<ElementHandle>> {
        let poll = PollConfig {
            timeout_ms: self.config.implicit_wait_ms,
            ..PollConfig::default()
        };
        let found = poll_until(
            || async {
                let inputs: Vec<ElementHandle> = self
                    .driver
                    .elements(Role::Textbox.query())
                    .await?
                    .into_iter()
                    .filter(|e| e.visible && e.is_text_entry())
                    .collect();
                Ok::<_, anyhow::Error>((inputs.len() >= min).then_some(inputs))
            },
            &poll,
        )
        .await?;

        found.ok_or_else(|| {
            HarnessError::ElementNotFound(format!("at least {} text input(s)", min)).into()
        })
    }

    pub async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.driver.click(element).await
    }

    pub async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.driver.type_text(element, text).await
    }

    pub async fn title(&self) -> Result<String> {
        self.driver.title().await
    }

    pub async fn content(&self) -> Result<String> {
        self.driver.content().await
    }

    pub async fn screenshot(&self, path: &Path) -> Result<()> {
        self.driver
            .screenshot(path)
            .await
            .with_context(|| format!("Failed to save screenshot {}", path.display()))
    }

    /// Capture the final screenshot if asked to, then close the browser. The
    /// browser is closed even when the capture fails.
    pub async fn end(self, final_screenshot: Option<&Path>) -> Result<()> {
        if let Some(path) = final_screenshot {
            match self.screenshot(path).await {
                Ok(()) => log::info!("final screenshot saved to {}", path.display()),
                Err(e) => log::warn!("final screenshot failed: {:#}", e),
            }
        }
        self.driver.close().await.context("Failed to close browser")
    }
}
