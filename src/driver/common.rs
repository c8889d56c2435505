//! Common utilities shared by the driver and the runner
//!
//! Polling with bounded timeouts and the case-insensitive text matching used
//! by element lookup and page assertions.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Polling Utilities
// ============================================================================

/// Configuration for polling operations
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub timeout_ms: u64,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub use_exponential_backoff: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10000,
            initial_interval_ms: 100,
            max_interval_ms: 500,
            use_exponential_backoff: true,
        }
    }
}

impl PollConfig {
    /// Fixed-interval polling bounded by `timeout`
    pub fn fixed(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            initial_interval_ms: interval.as_millis().max(1) as u64,
            max_interval_ms: interval.as_millis().max(1) as u64,
            use_exponential_backoff: false,
        }
    }
}

/// Poll `check_fn` until it yields `Some`, or the timeout elapses.
///
/// The check always runs at least once, so a zero timeout is a single
/// immediate attempt. Errors from the check abort the poll.
pub async fn poll_until<T, E, F, Fut>(check_fn: F, config: &PollConfig) -> Result<Option<T>, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut interval = config.initial_interval_ms;

    loop {
        if let Some(value) = check_fn().await? {
            return Ok(Some(value));
        }
        if start.elapsed() >= timeout {
            return Ok(None);
        }

        let remaining = timeout.saturating_sub(start.elapsed());
        tokio::time::sleep(Duration::from_millis(interval).min(remaining)).await;

        if config.use_exponential_backoff {
            interval = (interval * 3 / 2).min(config.max_interval_ms);
        }
    }
}

// ============================================================================
// Text Utilities
// ============================================================================

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Collapse runs of whitespace so rendered text compares predictably
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Login", "login"));
        assert!(contains_ignore_case("LOGIN NOW", "login"));
        assert!(contains_ignore_case("please login", "LOGIN"));
        assert!(!contains_ignore_case("Register", "login"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Log \n\t in "), "Log in");
    }

    #[tokio::test]
    async fn test_poll_until_returns_first_hit() {
        let calls = AtomicU32::new(0);
        let config = PollConfig::fixed(Duration::from_secs(2), Duration::from_millis(5));

        let result: Result<Option<u32>, ()> = poll_until(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(if n >= 2 { Some(n) } else { None }) }
            },
            &config,
        )
        .await;

        assert_eq!(result, Ok(Some(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_zero_timeout_checks_once() {
        let calls = AtomicU32::new(0);
        let config = PollConfig::fixed(Duration::ZERO, Duration::from_millis(5));

        let result: Result<Option<()>, ()> = poll_until(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            },
            &config,
        )
        .await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
