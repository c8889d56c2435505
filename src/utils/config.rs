use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8501";

/// Base URL from `MEDICONSULT_BASE_URL`, when set and non-empty
pub fn env_base_url() -> Option<String> {
    std::env::var("MEDICONSULT_BASE_URL")
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Browser session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Application root; relative navigation targets are joined onto it
    pub base_url: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// How long element lookups keep re-polling before reporting absence (ms)
    pub implicit_wait_ms: u64,
    /// Bound for the document ready signal (ms)
    pub ready_timeout_ms: u64,
    /// Extra delay after the ready signal for client-side rendering (ms)
    pub settle_delay_ms: u64,
    /// Explicit browser executable, otherwise resolved from the system
    pub browser_executable: Option<PathBuf>,
    /// Additional browser command-line switches
    pub extra_args: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let base_url = env_base_url().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Headless unless explicitly disabled; the harness mostly runs in CI
        let headless = std::env::var("MEDICONSULT_HEADLESS")
            .map(|v| !(v == "false" || v == "0"))
            .unwrap_or(true);

        Self {
            base_url,
            headless,
            window_width: 1920,
            window_height: 1080,
            implicit_wait_ms: 10000,
            ready_timeout_ms: 20000,
            settle_delay_ms: 2000,
            browser_executable: None,
            extra_args: Vec::new(),
        }
    }
}

impl SessionConfig {
    pub fn implicit_wait(&self) -> Duration {
        Duration::from_millis(self.implicit_wait_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Join a navigation target onto the base URL. Absolute URLs pass through.
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if target.is_empty() || target == "/" {
            format!("{}/", base)
        } else {
            format!("{}/{}", base, target.trim_start_matches('/'))
        }
    }

    /// Chromium switches for an isolated CI-friendly session
    pub fn launch_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--disable-extensions",
            "--disable-blink-features=AutomationControlled",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(format!(
            "--window-size={},{}",
            self.window_width, self.window_height
        ));
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// How browser sessions are provisioned across scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SessionPolicy {
    /// One session for the whole run
    #[default]
    Shared,
    /// A new isolated session per scenario
    Fresh,
}

/// Everything a harness run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub session: SessionConfig,
    pub session_policy: SessionPolicy,
    /// Directory for reports and screenshots
    pub output_dir: PathBuf,
    /// Capture a screenshot when a scenario does not pass
    pub snapshot_on_failure: bool,
    /// Poll the base URL over HTTP before launching the browser
    pub wait_for_app: Option<Duration>,
    /// Run only scenarios carrying all of these tags
    pub tags: Vec<String>,
    /// Run only scenarios with these names
    pub only: Vec<String>,
    /// Fixture variable overrides
    pub vars: HashMap<String, String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            session_policy: SessionPolicy::Shared,
            output_dir: PathBuf::from("./output"),
            snapshot_on_failure: false,
            wait_for_app: None,
            tags: Vec::new(),
            only: Vec::new(),
            vars: HashMap::new(),
        }
    }
}
