use anyhow::Result;
use std::time::{Duration, Instant};

use crate::error::HarnessError;

const PROBE_INTERVAL: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll the application over HTTP until it answers with any status.
///
/// Runs before the browser is launched, so an application that never comes
/// up is reported as an environment failure rather than twelve timeouts.
pub async fn wait_for_app(url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?;
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match client.get(url).send().await {
            Ok(response) => {
                log::info!(
                    "{} answered with {} after {} attempt(s)",
                    url,
                    response.status(),
                    attempts
                );
                return Ok(());
            }
            Err(e) => log::debug!("preflight attempt {} failed: {}", attempts, e),
        }

        if started.elapsed() >= timeout {
            return Err(HarnessError::EnvironmentUnavailable(format!(
                "{} did not answer within {}s",
                url,
                timeout.as_secs()
            ))
            .into());
        }
        tokio::time::sleep(PROBE_INTERVAL.min(timeout.saturating_sub(started.elapsed()))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_app_is_environment_failure() {
        // Port 9 (discard) on localhost is closed in test environments
        let err = wait_for_app("http://127.0.0.1:9/", Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::EnvironmentUnavailable(_))
        ));
    }
}
