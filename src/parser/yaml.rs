use super::types::{
    AwaitReadyParams, InputTextParams, RepeatParams, Scenario, Step, Suite, TapParams,
    TapParamsInput, TextMatchInput,
};
use anyhow::{Context, Result};
use std::path::Path;

/// Parse a YAML suite file
pub fn parse_suite_file(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_suite_content(&content)
        .with_context(|| format!("Failed to parse suite: {}", path.display()))
}

/// Parse YAML suite content
pub fn parse_suite_content(content: &str) -> Result<Suite> {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawSuite {
        #[serde(default)]
        suite: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        scenarios: Vec<RawScenario>,
    }

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RawScenario {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        steps: serde_yaml::Value,
    }

    let raw: RawSuite = serde_yaml::from_str(content).context("Failed to parse YAML suite")?;

    let mut scenarios = Vec::with_capacity(raw.scenarios.len());
    for scenario in raw.scenarios {
        if scenarios.iter().any(|s: &Scenario| s.name == scenario.name) {
            anyhow::bail!("Duplicate scenario name: {}", scenario.name);
        }
        let steps = parse_steps_from_value(&scenario.steps)
            .with_context(|| format!("Invalid steps in scenario '{}'", scenario.name))?;
        scenarios.push(Scenario {
            name: scenario.name,
            description: scenario.description,
            tags: scenario.tags,
            steps,
        });
    }

    Ok(Suite {
        name: raw.suite.unwrap_or_else(|| "default".to_string()),
        base_url: raw.base_url,
        scenarios,
    })
}

/// Parse a list of steps from a YAML value
pub fn parse_steps_from_value(value: &serde_yaml::Value) -> Result<Vec<Step>> {
    match value {
        serde_yaml::Value::Null => Ok(Vec::new()),
        serde_yaml::Value::Sequence(seq) => seq.iter().map(parse_step_value).collect(),
        _ => Ok(vec![parse_step_value(value)?]),
    }
}

/// Parse a single step from a YAML value
pub fn parse_step_value(value: &serde_yaml::Value) -> Result<Step> {
    match value {
        // Simple string step like "- awaitReady"
        serde_yaml::Value::String(s) => parse_simple_step(s),

        // Step with parameters like "- tapOn:\n    text: 'Login'"
        serde_yaml::Value::Mapping(map) => {
            let mut entries = map.iter();
            let (key, params) = match (entries.next(), entries.next()) {
                (Some(entry), None) => entry,
                _ => anyhow::bail!("Invalid step format: expected single key mapping"),
            };
            let name = key
                .as_str()
                .ok_or_else(|| anyhow::anyhow!("Step name must be a string"))?;

            if params.is_null() {
                return parse_simple_step(name);
            }

            parse_step_with_params(name, params)
        }

        _ => anyhow::bail!("Invalid step format: {:?}", value),
    }
}

/// Parse a step without parameters
fn parse_simple_step(name: &str) -> Result<Step> {
    match name {
        "awaitReady" | "waitForReady" => Ok(Step::AwaitReady(None)),
        "open" | "navigate" => Ok(Step::Open("/".to_string())),
        _ => anyhow::bail!("Unknown step or missing parameters: {}", name),
    }
}

/// Parse a step with parameters
fn parse_step_with_params(name: &str, params: &serde_yaml::Value) -> Result<Step> {
    let step = match name {
        "open" | "navigate" => Step::Open(serde_yaml::from_value(params.clone())?),

        "awaitReady" | "waitForReady" => {
            let p: AwaitReadyParams = serde_yaml::from_value(params.clone())?;
            Step::AwaitReady(p.timeout)
        }

        "pause" | "sleep" => Step::Pause(serde_yaml::from_value(params.clone())?),

        "tapOn" | "tap" | "click" => {
            let p: TapParamsInput = if params.is_string() {
                serde_yaml::from_value(params.clone())?
            } else {
                let inner: TapParams = serde_yaml::from_value(params.clone())?;
                TapParamsInput::Struct(inner)
            };
            let p = p.into_inner();
            Step::TapOn {
                locator: p.locator.into_locator()?,
                optional: p.optional,
            }
        }

        "inputText" | "type" => {
            let p: InputTextParams = serde_yaml::from_value(params.clone())?;
            Step::InputText {
                locator: p.locator.into_locator()?,
                value: p.value,
            }
        }

        "fillInputs" => Step::FillInputs(serde_yaml::from_value(params.clone())?),

        "waitForText" | "waitUntilVisible" => {
            let p = parse_text_match(params)?;
            Step::WaitForText {
                any_of: p.texts(),
                ignore_case: p.ignore_case,
                timeout_ms: p.timeout,
            }
        }

        "assertTitle" => Step::AssertTitle(serde_yaml::from_value(params.clone())?),

        "assertContains" | "see" => {
            let p = parse_text_match(params)?;
            Step::AssertContains {
                any_of: p.texts(),
                ignore_case: p.ignore_case,
            }
        }

        "assertNotContains" | "notSee" => {
            let p = parse_text_match(params)?;
            Step::AssertNotContains {
                none_of: p.texts(),
                ignore_case: p.ignore_case,
            }
        }

        "screenshot" | "takeScreenshot" => Step::Screenshot(serde_yaml::from_value(params.clone())?),

        "repeat" => {
            let p: RepeatParams = serde_yaml::from_value(params.clone())?;
            Step::Repeat {
                times: p.times,
                steps: parse_steps_from_value(&p.steps)?,
            }
        }

        _ => anyhow::bail!("Unknown step: {}", name),
    };

    Ok(step)
}

fn parse_text_match(params: &serde_yaml::Value) -> Result<super::types::TextMatchParams> {
    let input: TextMatchInput = serde_yaml::from_value(params.clone())?;
    let p = input.into_inner();
    if p.texts().is_empty() {
        anyhow::bail!("text match needs `text`, `anyOf` or `noneOf`");
    }
    Ok(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::locator::{Locator, Role};

    #[test]
    fn test_parse_simple_suite() {
        let yaml = r#"
suite: Demo
baseUrl: http://localhost:9000
scenarios:
  - name: login
    description: Log in
    tags: [smoke]
    steps:
      - open: /
      - awaitReady
      - tapOn: Register
      - tapOn:
          role: button
          name: Login
      - inputText:
          label: Email
          value: "${test_email}"
      - fillInputs: ["a", "b"]
      - pause: 500
      - assertTitle: Demo
      - assertContains:
          anyOf: [Dashboard, Welcome]
      - assertNotContains:
          text: Logout
          ignoreCase: true
"#;

        let suite = parse_suite_content(yaml).unwrap();
        assert_eq!(suite.name, "Demo");
        assert_eq!(suite.base_url.as_deref(), Some("http://localhost:9000"));
        assert_eq!(suite.scenarios.len(), 1);

        let steps = &suite.scenarios[0].steps;
        assert_eq!(steps.len(), 10);
        assert_eq!(steps[1], Step::AwaitReady(None));
        assert_eq!(
            steps[2],
            Step::TapOn {
                locator: Locator::text("Register"),
                optional: false
            }
        );
        assert_eq!(
            steps[3],
            Step::TapOn {
                locator: Locator::role(Role::Button, "Login"),
                optional: false
            }
        );
        assert_eq!(
            steps[4],
            Step::InputText {
                locator: Locator::Label("Email".to_string()),
                value: "${test_email}".to_string()
            }
        );
        assert_eq!(
            steps[8],
            Step::AssertContains {
                any_of: vec!["Dashboard".to_string(), "Welcome".to_string()],
                ignore_case: false
            }
        );
        assert_eq!(
            steps[9],
            Step::AssertNotContains {
                none_of: vec!["Logout".to_string()],
                ignore_case: true
            }
        );
    }

    #[test]
    fn test_parse_repeat_and_optional_tap() {
        let yaml = r#"
scenarios:
  - name: cycles
    steps:
      - repeat:
          times: 3
          steps:
            - open: /
            - awaitReady:
                timeout: 5000
      - tapOn:
          text: Register
          role: tab
          optional: true
"#;
        let suite = parse_suite_content(yaml).unwrap();
        let steps = &suite.scenarios[0].steps;
        match &steps[0] {
            Step::Repeat { times, steps } => {
                assert_eq!(*times, 3);
                assert_eq!(steps[1], Step::AwaitReady(Some(5000)));
            }
            other => panic!("expected repeat, got {:?}", other),
        }
        assert_eq!(
            steps[1],
            Step::TapOn {
                locator: Locator::Text {
                    text: "Register".to_string(),
                    role: Some(Role::Tab)
                },
                optional: true
            }
        );
    }

    #[test]
    fn test_unknown_step_names_scenario() {
        let yaml = r#"
scenarios:
  - name: broken
    steps:
      - flyTo: moon
"#;
        let err = parse_suite_content(yaml).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("broken"));
        assert!(message.contains("Unknown step: flyTo"));
    }

    #[test]
    fn test_duplicate_scenario_names_rejected() {
        let yaml = r#"
scenarios:
  - name: twice
    steps: [awaitReady]
  - name: twice
    steps: [awaitReady]
"#;
        assert!(parse_suite_content(yaml).is_err());
    }
}
