pub mod common;
pub mod locator;
pub mod traits;
pub mod web;

#[cfg(test)]
pub mod fake;

use anyhow::Result;

use crate::utils::config::SessionConfig;
use traits::BrowserDriver;

/// Launch the browser driver for a session
pub async fn launch(config: &SessionConfig) -> Result<Box<dyn BrowserDriver>> {
    let driver = web::PlaywrightDriver::launch(config).await?;
    Ok(Box::new(driver))
}
