//! Scripted in-process stand-in for a browser pointed at MediConsult.
//!
//! Renders the login/register tabs and role dashboards as a flat element
//! list, answers the same CSS queries the locators issue, and keeps accounts
//! in a [`FakeApp`] shared between browsers the way the real server would.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::traits::{BrowserDriver, ElementHandle};

pub const TITLE: &str = "MediConsult - Online Doctor Consultation";

pub const MSG_INVALID_LOGIN: &str = "Invalid email or password";
pub const MSG_DUPLICATE: &str = "Email already registered";
pub const MSG_REGISTERED: &str = "Registration successful! Please login.";
pub const MSG_EMPTY: &str = "Please fill in all fields";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Patient,
    Doctor,
    Admin,
}

#[derive(Debug, Clone)]
struct Account {
    name: String,
    password: String,
    role: AccountRole,
}

/// Server-side state shared by every browser session
#[derive(Debug)]
pub struct FakeApp {
    accounts: Mutex<HashMap<String, Account>>,
}

impl FakeApp {
    /// App seeded with the admin and cardiologist accounts
    pub fn seeded() -> Arc<Self> {
        let mut accounts = HashMap::new();
        accounts.insert(
            "admin@mediconsult.com".to_string(),
            Account {
                name: "Administrator".to_string(),
                password: "admin123".to_string(),
                role: AccountRole::Admin,
            },
        );
        accounts.insert(
            "cardio@mediconsult.com".to_string(),
            Account {
                name: "Dr. Sarah Smith".to_string(),
                password: "doctor123".to_string(),
                role: AccountRole::Doctor,
            },
        );
        Arc::new(Self {
            accounts: Mutex::new(accounts),
        })
    }
}

/// Observes a browser after it has been handed to a session
#[derive(Debug, Default)]
pub struct FakeProbe {
    closed: AtomicBool,
    close_calls: AtomicU32,
    navigations: AtomicU32,
}

impl FakeProbe {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u32 {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> u32 {
        self.navigations.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    LoginEmail,
    LoginPassword,
    RegisterName,
    RegisterEmail,
    RegisterPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    SelectTab(Tab),
    Input(Field),
    Submit(Tab),
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Unauthenticated(Tab),
    Dashboard(AccountRole),
}

#[derive(Debug, Clone)]
struct Node {
    tag: &'static str,
    text: String,
    role: Option<&'static str>,
    label: Option<&'static str>,
    input_type: Option<&'static str>,
    visible: bool,
    action: Action,
}

impl Node {
    fn new(tag: &'static str, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
            role: None,
            label: None,
            input_type: None,
            visible: true,
            action: Action::None,
        }
    }

    fn input(label: &'static str, input_type: &'static str, field: Field, visible: bool) -> Self {
        Self {
            label: Some(label),
            input_type: Some(input_type),
            visible,
            action: Action::Input(field),
            ..Self::new("input", "")
        }
    }

    fn hidden_if(mut self, hidden: bool) -> Self {
        self.visible = !hidden;
        self
    }

    fn matches(&self, query: &str) -> bool {
        query.split(',').any(|part| self.matches_part(part.trim()))
    }

    fn matches_part(&self, part: &str) -> bool {
        if part == "body *" {
            return true;
        }
        if let Some(rest) = part.strip_prefix("[role=\"") {
            return self.role == rest.strip_suffix("\"]");
        }
        if let Some(tag) = part.strip_suffix(":not([type=\"hidden\"])") {
            return self.tag == tag && self.input_type != Some("hidden");
        }
        if let Some((tag, attr)) = part.split_once('[') {
            let attr = attr.trim_end_matches(']');
            return match attr.strip_prefix("type=\"") {
                Some(value) => self.tag == tag && self.input_type == Some(value.trim_end_matches('"')),
                None => false,
            };
        }
        self.tag == part
    }
}

struct FakeState {
    view: View,
    flash: Option<String>,
    user: Option<String>,
    fields: HashMap<Field, String>,
    loading_polls_left: u32,
}

/// Fake [`BrowserDriver`] backed by a [`FakeApp`]
pub struct FakeBrowser {
    app: Arc<FakeApp>,
    state: Mutex<FakeState>,
    probe: Arc<FakeProbe>,
    loading_polls: u32,
    never_ready: bool,
    fail_screenshots: bool,
}

impl FakeBrowser {
    pub fn new(app: Arc<FakeApp>) -> Self {
        Self {
            app,
            state: Mutex::new(FakeState {
                view: View::Unauthenticated(Tab::Login),
                flash: None,
                user: None,
                fields: HashMap::new(),
                loading_polls_left: 0,
            }),
            probe: Arc::new(FakeProbe::default()),
            loading_polls: 1,
            never_ready: false,
            fail_screenshots: false,
        }
    }

    /// `document.readyState` never reaches `complete`
    pub fn never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }

    pub fn failing_screenshots(mut self) -> Self {
        self.fail_screenshots = true;
        self
    }

    pub fn probe(&self) -> Arc<FakeProbe> {
        self.probe.clone()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.probe.is_closed() {
            anyhow::bail!("browser has been closed");
        }
        Ok(())
    }

    fn render(&self, state: &FakeState) -> Vec<Node> {
        let mut nodes = vec![
            Node::new("div", ""),
            Node::new("h1", "MediConsult"),
            Node::new("p", "Online Doctor Consultation"),
        ];

        match state.view {
            View::Unauthenticated(tab) => {
                for (name, kind) in [("Login", Tab::Login), ("Register", Tab::Register)] {
                    nodes.push(Node {
                        role: Some("tab"),
                        action: Action::SelectTab(kind),
                        ..Node::new("button", name)
                    });
                }

                let login_hidden = tab != Tab::Login;
                nodes.push(Node::new("label", "Email").hidden_if(login_hidden));
                nodes.push(Node::input("Email", "text", Field::LoginEmail, !login_hidden));
                nodes.push(Node::new("label", "Password").hidden_if(login_hidden));
                nodes.push(Node::input(
                    "Password",
                    "password",
                    Field::LoginPassword,
                    !login_hidden,
                ));
                nodes.push(
                    Node {
                        action: Action::Submit(Tab::Login),
                        ..Node::new("button", "Login")
                    }
                    .hidden_if(login_hidden),
                );

                let register_hidden = tab != Tab::Register;
                nodes.push(Node::new("label", "Full Name").hidden_if(register_hidden));
                nodes.push(Node::input(
                    "Full Name",
                    "text",
                    Field::RegisterName,
                    !register_hidden,
                ));
                nodes.push(Node::new("label", "Email").hidden_if(register_hidden));
                nodes.push(Node::input(
                    "Email",
                    "text",
                    Field::RegisterEmail,
                    !register_hidden,
                ));
                nodes.push(Node::new("label", "Password").hidden_if(register_hidden));
                nodes.push(Node::input(
                    "Password",
                    "password",
                    Field::RegisterPassword,
                    !register_hidden,
                ));
                nodes.push(
                    Node {
                        action: Action::Submit(Tab::Register),
                        ..Node::new("button", "Register")
                    }
                    .hidden_if(register_hidden),
                );
            }
            View::Dashboard(role) => {
                let user = state.user.clone().unwrap_or_default();
                let (heading, extra) = match role {
                    AccountRole::Patient => (
                        "Patient Dashboard",
                        vec!["Available Doctors", "Dr. Sarah Smith - Cardiologist"],
                    ),
                    AccountRole::Doctor => ("Doctor Dashboard", vec!["Consultation Requests"]),
                    AccountRole::Admin => (
                        "Admin Dashboard",
                        vec![
                            "Users",
                            "Specialization",
                            "Dr. Sarah Smith - Cardiologist",
                            "Dr. James Lee - Dermatologist",
                        ],
                    ),
                };
                nodes.push(Node::new("h2", heading));
                nodes.push(Node::new("p", format!("Welcome, {}", user)));
                for text in extra {
                    nodes.push(Node::new("p", text));
                }
                nodes.push(Node {
                    action: Action::Logout,
                    ..Node::new("button", "Logout")
                });
            }
        }

        if let Some(flash) = &state.flash {
            nodes.push(Node::new("p", flash.clone()));
        }

        nodes
    }

    /// Nodes matching a query, in document order
    fn query(&self, state: &FakeState, query: &str) -> Vec<Node> {
        self.render(state)
            .into_iter()
            .filter(|n| n.matches(query))
            .collect()
    }

    fn node_for(&self, state: &FakeState, element: &ElementHandle) -> Result<Node> {
        self.query(state, &element.query)
            .into_iter()
            .nth(element.index)
            .ok_or_else(|| anyhow::anyhow!("{}[{}] is detached", element.query, element.index))
    }

    fn field(state: &FakeState, field: Field) -> String {
        state.fields.get(&field).cloned().unwrap_or_default()
    }

    fn submit(&self, state: &mut FakeState, tab: Tab) {
        match tab {
            Tab::Login => {
                let email = Self::field(state, Field::LoginEmail);
                let password = Self::field(state, Field::LoginPassword);
                if email.is_empty() || password.is_empty() {
                    state.flash = Some(MSG_EMPTY.to_string());
                    return;
                }
                let accounts = self.app.accounts.lock().unwrap();
                match accounts.get(&email) {
                    Some(account) if account.password == password => {
                        state.view = View::Dashboard(account.role);
                        state.user = Some(account.name.clone());
                        state.flash = None;
                    }
                    _ => state.flash = Some(MSG_INVALID_LOGIN.to_string()),
                }
            }
            Tab::Register => {
                let name = Self::field(state, Field::RegisterName);
                let email = Self::field(state, Field::RegisterEmail);
                let password = Self::field(state, Field::RegisterPassword);
                if name.is_empty() || email.is_empty() || password.is_empty() {
                    state.flash = Some(MSG_EMPTY.to_string());
                    return;
                }
                let mut accounts = self.app.accounts.lock().unwrap();
                if accounts.contains_key(&email) {
                    state.flash = Some(MSG_DUPLICATE.to_string());
                } else {
                    accounts.insert(
                        email,
                        Account {
                            name,
                            password,
                            role: AccountRole::Patient,
                        },
                    );
                    state.flash = Some(MSG_REGISTERED.to_string());
                }
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    fn browser_name(&self) -> &str {
        "fake"
    }

    async fn navigate(&self, _url: &str) -> Result<()> {
        self.ensure_open()?;
        self.probe.navigations.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.view = View::Unauthenticated(Tab::Login);
        state.flash = None;
        state.user = None;
        state.fields.clear();
        state.loading_polls_left = self.loading_polls;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(TITLE.to_string())
    }

    async fn content(&self) -> Result<String> {
        self.ensure_open()?;
        let state = self.state.lock().unwrap();
        let mut html = format!(
            "<html><head><title>{}</title></head><body><div class=\"stApp\">",
            TITLE
        );
        for node in self.render(&state).iter().skip(1) {
            let hidden = if node.visible { "" } else { " hidden" };
            if node.tag == "input" {
                html.push_str(&format!(
                    "<input type=\"{}\" aria-label=\"{}\"{}>",
                    node.input_type.unwrap_or("text"),
                    node.label.unwrap_or_default(),
                    hidden
                ));
            } else {
                let role = node
                    .role
                    .map(|r| format!(" role=\"{}\"", r))
                    .unwrap_or_default();
                html.push_str(&format!(
                    "<{tag}{role}{hidden}>{text}</{tag}>",
                    tag = node.tag,
                    role = role,
                    hidden = hidden,
                    text = escape(&node.text)
                ));
            }
        }
        html.push_str("</div></body></html>");
        Ok(html)
    }

    async fn elements(&self, query: &str) -> Result<Vec<ElementHandle>> {
        self.ensure_open()?;
        let state = self.state.lock().unwrap();
        Ok(self
            .query(&state, query)
            .into_iter()
            .enumerate()
            .map(|(index, node)| ElementHandle {
                query: query.to_string(),
                index,
                tag: node.tag.to_string(),
                own_text: node.text.clone(),
                text: node.text,
                role: node.role.map(str::to_string),
                label: node.label.map(str::to_string),
                input_type: node.input_type.map(str::to_string),
                visible: node.visible,
            })
            .collect())
    }

    async fn type_text(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        let node = self.node_for(&state, element)?;
        match node.action {
            Action::Input(field) if node.visible => {
                state.fields.insert(field, text.to_string());
                Ok(())
            }
            _ => anyhow::bail!("element {}[{}] is not editable", element.query, element.index),
        }
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock().unwrap();
        let node = self.node_for(&state, element)?;
        if !node.visible {
            anyhow::bail!("element {}[{}] is not visible", element.query, element.index);
        }
        match node.action {
            Action::SelectTab(tab) => {
                state.view = View::Unauthenticated(tab);
                state.flash = None;
            }
            Action::Submit(tab) => self.submit(&mut state, tab),
            Action::Logout => {
                state.view = View::Unauthenticated(Tab::Login);
                state.user = None;
                state.flash = None;
                state.fields.clear();
            }
            Action::Input(_) | Action::None => {}
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.ensure_open()?;
        if self.fail_screenshots {
            anyhow::bail!("screenshot capture failed");
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"\x89PNG\r\n\x1a\nfake")?;
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.ensure_open()?;
        if !script.contains("readyState") {
            return Ok(serde_json::Value::Null);
        }
        let mut state = self.state.lock().unwrap();
        if self.never_ready {
            return Ok(serde_json::json!("loading"));
        }
        if state.loading_polls_left > 0 {
            state.loading_polls_left -= 1;
            return Ok(serde_json::json!("interactive"));
        }
        Ok(serde_json::json!("complete"))
    }

    async fn close(&self) -> Result<()> {
        self.probe.close_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
