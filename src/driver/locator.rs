use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::common::{contains_ignore_case, normalize_whitespace};
use super::traits::{BrowserDriver, ElementHandle};

/// Tags whose text is never user-facing
const NON_RENDERED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "title"];

/// Role filter for element lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Button,
    Tab,
    Link,
    #[serde(alias = "input", alias = "textfield")]
    Textbox,
    Heading,
}

impl Role {
    /// CSS query enumerating every element that plays this role
    pub fn query(&self) -> &'static str {
        match self {
            Role::Button => {
                r#"button, [role="button"], input[type="submit"], input[type="button"]"#
            }
            Role::Tab => r#"[role="tab"]"#,
            Role::Link => r#"a[href], [role="link"]"#,
            Role::Textbox => r#"input:not([type="hidden"]), textarea, [role="textbox"]"#,
            Role::Heading => r#"h1, h2, h3, h4, h5, h6, [role="heading"]"#,
        }
    }

    /// Whether an enumerated element really plays this role. Widget toolkits
    /// render tabs as `<button role="tab">`, which the button query also hits.
    pub fn accepts(&self, element: &ElementHandle) -> bool {
        let explicit = element.role.as_deref();
        match self {
            Role::Button => !matches!(explicit, Some("tab" | "link" | "menuitem")),
            Role::Tab => explicit == Some("tab"),
            _ => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Button => "button",
            Role::Tab => "tab",
            Role::Link => "link",
            Role::Textbox => "textbox",
            Role::Heading => "heading",
        }
    }
}

/// Query used when no role filter is given
pub const ANY_ELEMENT_QUERY: &str = "body *";

/// How a step finds the control it acts on
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
    /// Case-insensitive substring over rendered text, optionally role-filtered
    Text { text: String, role: Option<Role> },
    /// Role plus accessible name, falling back to a role-filtered text search
    Role { role: Role, name: String },
    /// Text-entry control whose label contains the given text
    Label(String),
    /// The `index`-th visible element matching a CSS query
    Nth { query: String, index: usize },
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Text { text, role: None } => write!(f, "text \"{}\"", text),
            Locator::Text {
                text,
                role: Some(role),
            } => write!(f, "{} with text \"{}\"", role.as_str(), text),
            Locator::Role { role, name } => write!(f, "{} named \"{}\"", role.as_str(), name),
            Locator::Label(label) => write!(f, "field labelled \"{}\"", label),
            Locator::Nth { query, index } => write!(f, "{}[{}]", query, index),
        }
    }
}

impl Locator {
    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text {
            text: text.into(),
            role: None,
        }
    }

    pub fn role(role: Role, name: impl Into<String>) -> Self {
        Locator::Role {
            role,
            name: name.into(),
        }
    }

    /// Single lookup attempt against the current page. `Ok(None)` means the
    /// element is absent; errors only come from the driver itself.
    pub async fn resolve(&self, driver: &dyn BrowserDriver) -> Result<Option<ElementHandle>> {
        match self {
            Locator::Text { text, role: None } => {
                let elements = driver.elements(ANY_ELEMENT_QUERY).await?;
                Ok(first_text_match(&elements, text, false).cloned())
            }
            Locator::Text {
                text,
                role: Some(role),
            } => {
                let elements = role_elements(driver, *role).await?;
                Ok(first_text_match(&elements, text, true).cloned())
            }
            Locator::Role { role, name } => {
                let elements = role_elements(driver, *role).await?;
                if let Some(hit) = first_name_match(&elements, name) {
                    return Ok(Some(hit.clone()));
                }
                log::debug!(
                    "no {} with accessible name \"{}\", falling back to text search",
                    role.as_str(),
                    name
                );
                Ok(first_text_match(&elements, name, true).cloned())
            }
            Locator::Label(label) => {
                let elements = driver.elements(Role::Textbox.query()).await?;
                Ok(elements
                    .iter()
                    .filter(|e| e.visible)
                    .find(|e| {
                        e.label
                            .as_deref()
                            .is_some_and(|l| contains_ignore_case(l, label))
                    })
                    .cloned())
            }
            Locator::Nth { query, index } => {
                let elements = driver.elements(query).await?;
                Ok(elements.into_iter().filter(|e| e.visible).nth(*index))
            }
        }
    }
}

async fn role_elements(driver: &dyn BrowserDriver, role: Role) -> Result<Vec<ElementHandle>> {
    let mut elements = driver.elements(role.query()).await?;
    elements.retain(|e| e.visible && role.accepts(e));
    Ok(elements)
}

/// First visible element, in document order, whose text contains `text`
/// case-insensitively.
///
/// With `full_text` the element's whole rendered text is searched (used for
/// role-filtered queries, where the text usually sits in a child node).
/// Without it only the element's own text nodes count, so containers do not
/// shadow the control that actually carries the label.
pub fn first_text_match<'a>(
    elements: &'a [ElementHandle],
    text: &str,
    full_text: bool,
) -> Option<&'a ElementHandle> {
    elements
        .iter()
        .filter(|e| e.visible && !NON_RENDERED_TAGS.contains(&e.tag.as_str()))
        .find(|e| {
            let haystack = if full_text { &e.text } else { &e.own_text };
            contains_ignore_case(haystack, text)
        })
}

/// First element whose accessible name equals `name`, ignoring case and
/// whitespace differences.
pub fn first_name_match<'a>(elements: &'a [ElementHandle], name: &str) -> Option<&'a ElementHandle> {
    let wanted = normalize_whitespace(name).to_lowercase();
    elements
        .iter()
        .find(|e| normalize_whitespace(e.accessible_name()).to_lowercase() == wanted)
}
