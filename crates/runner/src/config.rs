//! Suite configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::server::ServerConfig;

/// Configuration threaded into the runner and fixtures at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Root of the site under test, including the language prefix
    pub base_url: String,

    /// Query string that switches the frontend into edit mode
    pub edit_query: String,

    /// Admin path relative to `base_url`
    pub admin_path: String,

    /// Language prefix the CMS redirects to after deleting a page
    pub language: String,

    /// Output directory for results
    pub output_dir: PathBuf,

    /// Login credentials
    pub credentials: Credentials,

    /// Timeouts and polling
    pub timeouts: TimeoutConfig,

    /// Browser configuration
    pub browser: BrowserConfig,

    /// Optional development server to launch before the suite
    pub server: Option<ServerConfig>,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/en/".to_string(),
            edit_query: "?edit".to_string(),
            admin_path: "admin/".to_string(),
            language: "en".to_string(),
            output_dir: PathBuf::from("test-results"),
            credentials: Credentials::default(),
            timeouts: TimeoutConfig::default(),
            browser: BrowserConfig::default(),
            server: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default navigation timeout
    pub navigation_ms: u64,

    /// Default `wait_for` timeout
    pub wait_ms: u64,

    /// Interval between condition polls
    pub poll_interval_ms: u64,

    /// Deadline for setup plus all scenarios (teardown excluded)
    pub suite_ms: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            navigation_ms: 10_000,
            wait_ms: 5_000,
            poll_interval_ms: 100,
            suite_ms: None,
        }
    }
}

impl TimeoutConfig {
    pub fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn suite(&self) -> Option<Duration> {
        self.suite_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Configuration(format!("unknown browser: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub kind: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Path of the `node` executable
    pub node_binary: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            kind: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 1024,
            node_binary: PathBuf::from("node"),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> E2eResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the runner cannot work with
    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::Configuration(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(E2eError::Configuration(
                "timeouts.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.credentials.username.is_empty() {
            return Err(E2eError::Configuration("credentials.username is empty".to_string()));
        }
        Ok(())
    }

    /// Base URL with a guaranteed trailing slash
    pub fn base(&self) -> String {
        if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        }
    }

    /// `scheme://host[:port]` part of the base URL
    pub fn origin(&self) -> &str {
        let after_scheme = self.base_url.find("://").map(|i| i + 3).unwrap_or(0);
        match self.base_url[after_scheme..].find('/') {
            Some(i) => &self.base_url[..after_scheme + i],
            None => &self.base_url,
        }
    }

    /// Resolve a step URL: absolute URLs pass through, `/path` is taken from
    /// the origin, anything else is appended to the base URL.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.origin(), url)
        } else {
            format!("{}{}", self.base(), url)
        }
    }

    /// Frontend URL in edit mode
    pub fn edit_url(&self) -> String {
        format!("{}{}", self.base(), self.edit_query)
    }

    /// URL below the admin root
    pub fn admin_url(&self, path: &str) -> String {
        let admin = self.admin_path.trim_matches('/');
        format!("{}{}/{}", self.base(), admin, path.trim_start_matches('/'))
    }
}
