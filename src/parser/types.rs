use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::driver::locator::{Locator, Role};

/// A parsed suite file: an ordered catalog of scenarios
#[derive(Debug, Clone)]
pub struct Suite {
    pub name: String,
    /// Base URL declared by the suite; CLI and environment settings win
    pub base_url: Option<String>,
    pub scenarios: Vec<Scenario>,
}

/// One self-contained navigate/act/assert procedure
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub steps: Vec<Step>,
}

/// A single scenario step
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Navigate to a URL, relative targets are joined onto the base URL
    Open(String),
    /// Wait for the ready signal; `None` uses the session's timeout
    AwaitReady(Option<u64>),
    /// Fixed delay (ms)
    Pause(u64),
    /// Click a control. Optional taps are skipped when the control is absent.
    TapOn { locator: Locator, optional: bool },
    /// Type a value into a located field
    InputText { locator: Locator, value: String },
    /// Type values into the visible text fields in document order
    FillInputs(Vec<String>),
    /// Poll the page until any of the texts appears
    WaitForText {
        any_of: Vec<String>,
        ignore_case: bool,
        timeout_ms: Option<u64>,
    },
    /// Document title must contain the text
    AssertTitle(String),
    /// Page markup must contain at least one of the texts
    AssertContains {
        any_of: Vec<String>,
        ignore_case: bool,
    },
    /// Page markup must contain none of the texts
    AssertNotContains {
        none_of: Vec<String>,
        ignore_case: bool,
    },
    /// Capture a named screenshot artifact
    Screenshot(String),
    Repeat { times: u32, steps: Vec<Step> },
}

impl Step {
    /// Short human-readable form for console output and reports
    pub fn display(&self) -> String {
        match self {
            Step::Open(target) => format!("open {}", target),
            Step::AwaitReady(_) => "awaitReady".to_string(),
            Step::Pause(ms) => format!("pause {}ms", ms),
            Step::TapOn { locator, optional } => {
                if *optional {
                    format!("tapOn {} (optional)", locator)
                } else {
                    format!("tapOn {}", locator)
                }
            }
            Step::InputText { locator, .. } => format!("inputText into {}", locator),
            Step::FillInputs(values) => format!("fillInputs ({} fields)", values.len()),
            Step::WaitForText { any_of, .. } => format!("waitForText {}", quote_all(any_of)),
            Step::AssertTitle(text) => format!("assertTitle \"{}\"", text),
            Step::AssertContains { any_of, .. } => format!("assertContains {}", quote_all(any_of)),
            Step::AssertNotContains { none_of, .. } => {
                format!("assertNotContains {}", quote_all(none_of))
            }
            Step::Screenshot(name) => format!("screenshot {}", name),
            Step::Repeat { times, steps } => format!("repeat {}x ({} steps)", times, steps.len()),
        }
    }
}

fn quote_all(texts: &[String]) -> String {
    texts
        .iter()
        .map(|t| format!("\"{}\"", t))
        .collect::<Vec<_>>()
        .join(" | ")
}

// ============================================================================
// Step parameter inputs (YAML shapes)
// ============================================================================

/// Locator fields shared by every step that targets an element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocatorParams {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    /// Accessible name, used together with `role`
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// CSS query for positional lookup
    #[serde(default, alias = "tag")]
    pub query: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
}

impl LocatorParams {
    pub fn into_locator(self) -> Result<Locator> {
        let locator = match self {
            LocatorParams {
                role: Some(role),
                name: Some(name),
                ..
            } => Locator::Role { role, name },
            LocatorParams {
                text: Some(text),
                role,
                ..
            } => Locator::Text { text, role },
            LocatorParams {
                label: Some(label), ..
            } => Locator::Label(label),
            LocatorParams {
                query: Some(query),
                index,
                ..
            } => Locator::Nth {
                query,
                index: index.unwrap_or(0),
            },
            LocatorParams {
                role: Some(role),
                index,
                ..
            } => Locator::Nth {
                query: role.query().to_string(),
                index: index.unwrap_or(0),
            },
            _ => anyhow::bail!(
                "locator needs one of: text, role + name, label, query (tag) + index"
            ),
        };
        Ok(locator)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TapParams {
    #[serde(flatten)]
    pub locator: LocatorParams,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TapParamsInput {
    String(String),
    Struct(TapParams),
}

impl TapParamsInput {
    pub fn into_inner(self) -> TapParams {
        match self {
            TapParamsInput::String(text) => TapParams {
                locator: LocatorParams {
                    text: Some(text),
                    ..Default::default()
                },
                optional: false,
            },
            TapParamsInput::Struct(params) => params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTextParams {
    #[serde(flatten)]
    pub locator: LocatorParams,
    pub value: String,
}

/// One text or a list of alternatives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMatchParams {
    #[serde(default)]
    pub text: Option<OneOrMany>,
    #[serde(default)]
    pub any_of: Vec<String>,
    #[serde(default)]
    pub none_of: Vec<String>,
    #[serde(default)]
    pub ignore_case: bool,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl TextMatchParams {
    /// All texts named by `text`, `anyOf` and `noneOf`, in that order
    pub fn texts(&self) -> Vec<String> {
        let mut texts = self
            .text
            .clone()
            .map(OneOrMany::into_vec)
            .unwrap_or_default();
        texts.extend(self.any_of.iter().cloned());
        texts.extend(self.none_of.iter().cloned());
        texts
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextMatchInput {
    String(String),
    Struct(TextMatchParams),
}

impl TextMatchInput {
    pub fn into_inner(self) -> TextMatchParams {
        match self {
            TextMatchInput::String(s) => TextMatchParams {
                text: Some(OneOrMany::One(s)),
                any_of: Vec::new(),
                none_of: Vec::new(),
                ignore_case: false,
                timeout: None,
            },
            TextMatchInput::Struct(params) => params,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwaitReadyParams {
    #[serde(default)]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatParams {
    pub times: u32,
    pub steps: serde_yaml::Value,
}
