//! Web Driver implementation using Playwright
//!
//! Drives a Chromium browser through the Playwright library. One driver owns
//! one browser process, one fresh (non-persistent) context and one page.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use std::path::Path;
use tokio::sync::Mutex;

use crate::driver::traits::{BrowserDriver, ElementHandle};
use crate::error::HarnessError;
use crate::utils::binary_resolver::find_browser;
use crate::utils::config::SessionConfig;

/// Snapshot every element matched by a CSS query, in document order.
const SNAPSHOT_JS: &str = r#"
(query) => Array.from(document.querySelectorAll(query)).map((el, index) => {
    const ownText = Array.from(el.childNodes)
        .filter((n) => n.nodeType === Node.TEXT_NODE)
        .map((n) => n.textContent)
        .join('');
    let label = el.getAttribute('aria-label');
    if (!label && el.labels && el.labels.length > 0) {
        label = el.labels[0].innerText;
    }
    if (!label) {
        label = el.getAttribute('placeholder');
    }
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return {
        index,
        tag: el.tagName.toLowerCase(),
        text: (el.innerText || el.textContent || '').trim(),
        ownText: ownText.trim(),
        role: el.getAttribute('role'),
        label: label,
        inputType: el.getAttribute('type'),
        visible: style.display !== 'none'
            && style.visibility !== 'hidden'
            && (rect.width > 0 || rect.height > 0),
    };
})
"#;

/// Web Driver using Playwright
pub struct PlaywrightDriver {
    // Dropping the Playwright handle stops the driver process, so it lives
    // as long as the browser does.
    #[allow(dead_code)]
    playwright: Playwright,
    browser: Mutex<Option<Browser>>,
    #[allow(dead_code)]
    context: BrowserContext,
    page: Mutex<Page>,
}

impl PlaywrightDriver {
    /// Launch Chromium with an isolated context and a single page.
    ///
    /// Any failure to bring the browser up is reported as
    /// [`HarnessError::EnvironmentUnavailable`].
    pub async fn launch(config: &SessionConfig) -> Result<Self> {
        let playwright = Playwright::initialize().await.map_err(|e| {
            HarnessError::EnvironmentUnavailable(format!("failed to start Playwright: {}", e))
        })?;

        let browser = launch_chromium_browser(&playwright, config)
            .await
            .map_err(|e| HarnessError::EnvironmentUnavailable(format!("{:#}", e)))?;

        let opened = open_page(&browser, config).await;
        let (context, page) = release_on_error(opened, || async {
            browser.close().await.map_err(anyhow::Error::from)
        })
        .await?;

        Ok(Self {
            playwright,
            browser: Mutex::new(Some(browser)),
            context,
            page: Mutex::new(page),
        })
    }

    /// Re-query the live element behind a snapshot
    async fn live_element(
        &self,
        page: &Page,
        element: &ElementHandle,
    ) -> Result<playwright::api::ElementHandle> {
        let mut matches = page.query_selector_all(&element.query).await?;
        if element.index >= matches.len() {
            anyhow::bail!(HarnessError::ElementNotFound(format!(
                "{}[{}] is no longer attached",
                element.query, element.index
            )));
        }
        Ok(matches.swap_remove(element.index))
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    fn browser_name(&self) -> &str {
        "chromium"
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.title().await?)
    }

    async fn content(&self) -> Result<String> {
        let page = self.page.lock().await;
        Ok(page.content().await?)
    }

    async fn elements(&self, query: &str) -> Result<Vec<ElementHandle>> {
        let page = self.page.lock().await;
        let mut elements: Vec<ElementHandle> = page
            .evaluate(SNAPSHOT_JS, query.to_string())
            .await
            .with_context(|| format!("Failed to enumerate elements for '{}'", query))?;
        for element in &mut elements {
            element.query = query.to_string();
        }
        Ok(elements)
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        let page = self.page.lock().await;
        let handle = self.live_element(&page, element).await?;
        handle.fill_builder(text).fill().await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let page = self.page.lock().await;
        let handle = self.live_element(&page, element).await?;
        if let Err(e) = handle.click_builder().click().await {
            println!(
                "{} Click failed for '{}'[{}]: {:?}",
                "❌".red(),
                element.query,
                element.index,
                e
            );
            return Err(anyhow::anyhow!(
                "Failed to click {}[{}]: {:?}",
                element.query,
                element.index,
                e
            ));
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path.to_path_buf())
            .screenshot()
            .await?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.page.lock().await;
        let value: serde_json::Value = page.evaluate(script, ()).await?;
        Ok(value)
    }

    async fn close(&self) -> Result<()> {
        let browser = self.browser.lock().await.take();
        if let Some(browser) = browser {
            log::debug!("closing browser");
            browser.close().await?;
        }
        Ok(())
    }
}

/// Fresh context with a single page sized to the configured window
async fn open_page(browser: &Browser, config: &SessionConfig) -> Result<(BrowserContext, Page)> {
    let context = browser
        .context_builder()
        .build()
        .await
        .context("Failed to create browser context")?;
    let page = context.new_page().await.context("Failed to open page")?;

    page.set_viewport_size(Viewport {
        width: config.window_width as i32,
        height: config.window_height as i32,
    })
    .await
    .context("Failed to set viewport size")?;

    Ok((context, page))
}

/// On a setup error, close the already launched browser and report the
/// error as an unavailable environment
async fn release_on_error<T, C, Fut>(result: Result<T>, close: C) -> Result<T>
where
    C: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<()>>,
{
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(close_err) = close().await {
                log::warn!("failed to close browser after setup error: {:#}", close_err);
            }
            Err(HarnessError::EnvironmentUnavailable(format!("{:#}", e)).into())
        }
    }
}

/// Launch a new Chromium browser for the given session configuration
async fn launch_chromium_browser(
    playwright: &Playwright,
    config: &SessionConfig,
) -> Result<Browser> {
    let chromium = playwright.chromium();
    let mut launcher = chromium.launcher().headless(config.headless);

    let executable = find_browser(config.browser_executable.as_deref());
    if let Some(ref path) = executable {
        println!("{} Using browser: {}", "🌐".blue(), path.display());
        launcher = launcher.executable(path);
    } else {
        println!(
            "{} No browser executable found. Attempting Playwright default launch...",
            "ℹ".blue()
        );
    }

    let args = config.launch_args();
    log::debug!("chromium args: {:?}", args);
    launcher = launcher.args(&args);

    launcher
        .launch()
        .await
        .context("Failed to launch Chromium")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_setup_error_closes_browser() {
        let closed = AtomicBool::new(false);
        let failed: Result<u32> = Err(anyhow::anyhow!("Failed to open page"));

        let err = release_on_error(failed, || async {
            closed.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(closed.load(Ordering::SeqCst));
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::EnvironmentUnavailable(msg)) if msg.contains("open page")
        ));
    }

    #[tokio::test]
    async fn test_setup_success_keeps_browser_open() {
        let closed = AtomicBool::new(false);
        let value = release_on_error(Ok(7), || async {
            closed.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert!(!closed.load(Ordering::SeqCst));
    }
}
