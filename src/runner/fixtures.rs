use fake::faker::name::en::Name;
use fake::Fake;
use rand::Rng;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Password used for every freshly registered account
pub const TEST_PASSWORD: &str = "TestPass123!";

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 8;

/// Per-run fixture values, substituted into step parameters as `${name}`.
///
/// Generated once when the run starts and read-only afterwards, so the
/// registration and login scenarios see the same credentials.
#[derive(Debug, Clone)]
pub struct FixtureData {
    vars: HashMap<String, String>,
}

impl FixtureData {
    /// Fresh credentials for this run plus user overrides (overrides win)
    pub fn generate(base_url: &str, overrides: &HashMap<String, String>) -> Self {
        let mut vars = HashMap::new();
        vars.insert("test_email".to_string(), unique_email());
        vars.insert("test_password".to_string(), TEST_PASSWORD.to_string());
        vars.insert("test_name".to_string(), Name().fake::<String>());
        vars.insert("run_id".to_string(), uuid::Uuid::new_v4().to_string());
        vars.insert("base_url".to_string(), base_url.to_string());

        for (key, value) in overrides {
            vars.insert(key.clone(), value.clone());
        }

        log::debug!(
            "fixtures generated: test_email={}",
            vars.get("test_email").map(String::as_str).unwrap_or_default()
        );

        Self { vars }
    }

    /// Get a fixture value, falling back to the process environment
    pub fn get(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Substitute `${name}` placeholders. Unknown names are left as written.
    pub fn substitute(&self, text: &str) -> String {
        if !text.contains("${") {
            return text.to_string();
        }

        placeholder_regex()
            .replace_all(text, |caps: &regex::Captures| {
                let key = &caps[1];
                if let Some(value) = self.get(key) {
                    return value;
                }
                match key {
                    "date" => chrono::Local::now().format("%Y-%m-%d").to_string(),
                    "timestamp" => chrono::Utc::now().timestamp().to_string(),
                    _ => format!("${{{}}}", key),
                }
            })
            .to_string()
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([a-zA-Z0-9_]+)\}").expect("placeholder regex"))
}

/// `test_<8 lowercase alphanumerics>@test.com`
pub fn unique_email() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("test_{}@test.com", suffix)
}
