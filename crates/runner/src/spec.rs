//! Scenario and step model, loadable from declarative YAML

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// A named end-to-end test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// When set the scenario is reported as skipped instead of executed
    #[serde(default)]
    pub skip: Option<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            tags: Vec::new(),
            skip: None,
            steps,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            E2eError::SpecParse(format!("{}: {}", path.display(), e))
        })
    }

    /// Load all scenarios from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::Configuration(format!(
                "scenario directory not found: {}",
                dir.display()
            )));
        }

        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.has_tag(tag)).collect()
    }
}

/// Something on the page a step acts on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Css(String),
    Xpath(String),
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Target::Css(selector.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Target::Xpath(expr.into())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Css(s) => write!(f, "css={}", s),
            Target::Xpath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Condition polled by a `wait_for` step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Element exists and is rendered
    Visible(Target),
    /// Element exists in the DOM
    Present(Target),
    /// Current URL matches a regular expression
    UrlMatches(String),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Visible(t) => write!(f, "visible {}", t),
            Condition::Present(t) => write!(f, "present {}", t),
            Condition::UrlMatches(p) => write!(f, "url ~ /{}/", p),
        }
    }
}

/// UI action performed by an `interact` step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Click,
    /// Fill named fields of the target form
    Fill {
        fields: BTreeMap<String, String>,
        #[serde(default)]
        submit: bool,
    },
}

/// Predicate and expected value of an `assert` step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    /// Document title matches a regular expression
    TitleMatches(String),
    /// Current URL matches a regular expression
    UrlMatches(String),
    /// Form field with this `name` has exactly this value
    FieldEquals { name: String, value: String },
    /// Element text contains `text`
    HasText { target: Target, text: String },
    /// Element is visible
    Visible(Target),
}

impl Check {
    /// Expected value as shown in reports
    pub fn expected(&self) -> String {
        match self {
            Check::TitleMatches(p) | Check::UrlMatches(p) => format!("/{}/", p),
            Check::FieldEquals { value, .. } => format!("{:?}", value),
            Check::HasText { text, .. } => format!("contains {:?}", text),
            Check::Visible(_) => "visible".to_string(),
        }
    }
}

/// A single step of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL, absolute or relative to the base URL
    Navigate {
        url: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Reload the current page
    Reload {
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Poll until a condition holds
    WaitFor {
        condition: Condition,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Click or fill
    Interact { action: Action, target: Target },

    /// Run nested steps inside the embedded frame at `index`
    EnterFrame { index: usize, steps: Vec<Step> },

    /// Record a pass/fail result; never aborts the scenario
    Assert { check: Check, description: String },

    /// Named sub-sequence, executed inline
    Group { name: String, steps: Vec<Step> },
}

impl Step {
    pub fn navigate(url: impl Into<String>) -> Self {
        Step::Navigate { url: url.into(), timeout_ms: None }
    }

    pub fn reload() -> Self {
        Step::Reload { timeout_ms: None }
    }

    pub fn wait_visible(target: Target) -> Self {
        Step::WaitFor { condition: Condition::Visible(target), timeout_ms: None }
    }

    pub fn wait_present(target: Target) -> Self {
        Step::WaitFor { condition: Condition::Present(target), timeout_ms: None }
    }

    pub fn wait_url(pattern: impl Into<String>) -> Self {
        Step::WaitFor { condition: Condition::UrlMatches(pattern.into()), timeout_ms: None }
    }

    pub fn click(target: Target) -> Self {
        Step::Interact { action: Action::Click, target }
    }

    pub fn fill<I, K, V>(form: Target, fields: I, submit: bool) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Step::Interact {
            action: Action::Fill {
                fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
                submit,
            },
            target: form,
        }
    }

    pub fn in_frame(index: usize, steps: Vec<Step>) -> Self {
        Step::EnterFrame { index, steps }
    }

    pub fn assert(check: Check, description: impl Into<String>) -> Self {
        Step::Assert { check, description: description.into() }
    }

    pub fn group(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Step::Group { name: name.into(), steps }
    }

    /// Short label used in logs and failure reports
    pub fn label(&self) -> String {
        match self {
            Step::Navigate { url, .. } => format!("navigate:{}", url),
            Step::Reload { .. } => "reload".to_string(),
            Step::WaitFor { condition, .. } => format!("wait_for:{}", condition),
            Step::Interact { action: Action::Click, target } => format!("click:{}", target),
            Step::Interact { action: Action::Fill { .. }, target } => format!("fill:{}", target),
            Step::EnterFrame { index, .. } => format!("enter_frame:{}", index),
            Step::Assert { description, .. } => {
                format!("assert:{}", description.chars().take(40).collect::<String>())
            }
            Step::Group { name, .. } => format!("group:{}", name),
        }
    }
}
