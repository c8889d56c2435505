use std::path::{Path, PathBuf};

/// Environment variable pointing at an explicit browser executable
pub const BROWSER_ENV: &str = "MEDICONSULT_BROWSER";

/// Well-known install locations, Chrome first, then Chromium-family fallbacks
const SYSTEM_BROWSER_PATHS: &[&str] = &[
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    // Fallback to Chromium and other browsers
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

/// Executable names looked up on PATH
const PATH_BROWSER_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Resolve a Chromium-family browser executable.
///
/// Order: explicit path (CLI or env), well-known install locations, PATH.
/// `None` means Playwright should fall back to its own bundled browser.
pub fn find_browser(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(BROWSER_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    find_system_browser().or_else(find_browser_on_path)
}

fn find_system_browser() -> Option<PathBuf> {
    SYSTEM_BROWSER_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

fn find_browser_on_path() -> Option<PathBuf> {
    PATH_BROWSER_NAMES
        .iter()
        .find_map(|name| which::which(name).ok())
}
