use thiserror::Error;

/// Failures the harness knows how to classify.
///
/// Anything that is not one of these reaches the scenario boundary as a plain
/// `anyhow::Error` and is recorded as an errored outcome.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// No browser could be launched (or the target app never answered the
    /// preflight). Fatal for the whole run.
    #[error("browser environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("page did not become ready within {timeout_ms}ms")]
    PageLoadTimeout { timeout_ms: u64 },

    /// A bounded wait on page content elapsed
    #[error("timed out after {timeout_ms}ms waiting for {condition}")]
    WaitTimeout { condition: String, timeout_ms: u64 },

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),
}

impl HarnessError {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed(message.into())
    }
}
