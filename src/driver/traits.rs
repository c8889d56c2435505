use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Snapshot of one rendered element, as seen through the browser boundary.
///
/// `index` is the element's position in the result list of the query that
/// produced it, which is document order. Drivers use `(query, index)` to act
/// on the element again.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementHandle {
    /// CSS query this element was enumerated with
    #[serde(default)]
    pub query: String,
    pub index: usize,
    /// Lowercase tag name
    pub tag: String,
    /// Full rendered text (innerText, falls back to textContent)
    #[serde(default)]
    pub text: String,
    /// Text of the element's direct text nodes only
    #[serde(default)]
    pub own_text: String,
    /// Explicit or implicit ARIA role
    #[serde(default)]
    pub role: Option<String>,
    /// aria-label, else associated <label>, else placeholder
    #[serde(default)]
    pub label: Option<String>,
    /// `type` attribute for inputs
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ElementHandle {
    /// Accessible name: label first, then rendered text.
    pub fn accessible_name(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label.trim(),
            _ => self.text.trim(),
        }
    }

    /// Whether this element accepts typed text.
    pub fn is_text_entry(&self) -> bool {
        match self.tag.as_str() {
            "textarea" => true,
            "input" => !matches!(
                self.input_type.as_deref(),
                Some("hidden" | "checkbox" | "radio" | "submit" | "button" | "file" | "image")
            ),
            _ => false,
        }
    }
}

/// Browser automation boundary.
///
/// The harness only ever talks to the application under test through this
/// trait: navigation, reading rendered output, enumerating elements and
/// simulating user input. Everything the harness knows about the app comes
/// from the rendered DOM.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Browser name for logs and reports (e.g. "chromium")
    fn browser_name(&self) -> &str;

    /// Navigate the page to an absolute URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Current document title
    async fn title(&self) -> Result<String>;

    /// Full rendered markup of the current page
    async fn content(&self) -> Result<String>;

    /// Enumerate elements matching a CSS query in document order
    async fn elements(&self, query: &str) -> Result<Vec<ElementHandle>>;

    /// Type text into an element previously returned by [`elements`]
    ///
    /// [`elements`]: BrowserDriver::elements
    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()>;

    /// Click an element previously returned by [`elements`]
    ///
    /// [`elements`]: BrowserDriver::elements
    async fn click(&self, element: &ElementHandle) -> Result<()>;

    /// Save a PNG screenshot of the viewport
    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// Evaluate an inline script expression and return its JSON value.
    /// The harness only uses this to read `document.readyState`.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Terminate the browser. Must be safe to call more than once.
    async fn close(&self) -> Result<()>;
}
