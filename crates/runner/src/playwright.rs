//! Playwright browser automation through a long-lived node bridge

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{BrowserConfig, TimeoutConfig};
use crate::driver::BrowserDriver;
use crate::error::{DriverError, DriverResult, E2eError, E2eResult};
use crate::spec::Target;

const BRIDGE_SCRIPT: &str = include_str!("../assets/bridge.js");

const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time granted to the bridge on top of the browser-side timeout
const RESPONSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    cmd: &'a str,
    args: Value,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    error: Option<BridgeFailure>,
}

#[derive(Deserialize)]
struct BridgeFailure {
    kind: String,
    message: String,
}

/// Newline-delimited JSON requests, answered by responses carrying the same id
struct Bridge<R, W> {
    reader: Lines<R>,
    writer: W,
    next_id: u64,
}

impl<R, W> Bridge<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    fn new(reader: R, writer: W) -> Self {
        Self {
            reader: reader.lines(),
            writer,
            next_id: 0,
        }
    }

    async fn read_ready(&mut self) -> E2eResult<()> {
        loop {
            let line = self.reader.next_line().await?.ok_or_else(|| {
                E2eError::Playwright("bridge exited during startup".to_string())
            })?;

            match serde_json::from_str::<Response>(&line) {
                Ok(response) if response.ready => return Ok(()),
                _ => debug!("bridge: {}", line),
            }
        }
    }

    async fn call(&mut self, cmd: &str, args: Value, limit: Duration) -> DriverResult<Value> {
        self.next_id += 1;
        let id = self.next_id;

        let mut line = serde_json::to_string(&Request { id, cmd, args })
            .map_err(|e| DriverError::Failed(e.to_string()))?;
        line.push('\n');

        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|_| DriverError::Closed)?;
        self.writer.flush().await.map_err(|_| DriverError::Closed)?;

        let wait = limit + RESPONSE_GRACE;
        match timeout(wait, self.read_response(id, limit)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("bridge gave no answer to {} #{} within {:?}", cmd, id, wait);
                Err(DriverError::Timeout(wait))
            }
        }
    }

    async fn read_response(&mut self, id: u64, limit: Duration) -> DriverResult<Value> {
        loop {
            let line = self
                .reader
                .next_line()
                .await
                .map_err(|e| DriverError::Failed(e.to_string()))?
                .ok_or(DriverError::Closed)?;

            let response: Response = match serde_json::from_str(&line) {
                Ok(response) => response,
                Err(_) => {
                    debug!("bridge: {}", line);
                    continue;
                }
            };

            // Late answers to requests we already gave up on
            if response.id != Some(id) {
                continue;
            }

            if response.ok {
                return Ok(response.value);
            }

            let failure = response.error.unwrap_or(BridgeFailure {
                kind: "failed".to_string(),
                message: "bridge reported an error without details".to_string(),
            });

            return Err(match failure.kind.as_str() {
                "not_found" => DriverError::NotFound(failure.message),
                "timeout" => DriverError::Timeout(limit),
                _ => DriverError::Failed(failure.message),
            });
        }
    }
}

/// One browser, one context, one page, hosted by a node process
pub struct PlaywrightSession {
    child: Child,
    bridge: Bridge<BufReader<ChildStdout>, ChildStdin>,
    action_timeout: Duration,
    closed: bool,
    _workdir: TempDir,
}

impl PlaywrightSession {
    /// Start the bridge and wait until the page is open
    pub async fn launch(config: &BrowserConfig, timeouts: &TimeoutConfig) -> E2eResult<Self> {
        Self::check_playwright_installed().await?;

        let workdir = tempfile::tempdir()?;
        let script_path = workdir.path().join("bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = Command::new(&config.node_binary)
            .arg(&script_path)
            .env("PAGECTL_BROWSER", config.kind.as_str())
            .env("PAGECTL_HEADLESS", if config.headless { "1" } else { "0" })
            .env("PAGECTL_VIEWPORT_WIDTH", config.viewport_width.to_string())
            .env("PAGECTL_VIEWPORT_HEIGHT", config.viewport_height.to_string())
            .env("PAGECTL_ACTION_TIMEOUT", timeouts.wait_ms.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "failed to start {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        let mut session = Self {
            child,
            bridge: Bridge::new(BufReader::new(stdout), stdin),
            action_timeout: timeouts.wait(),
            closed: false,
            _workdir: workdir,
        };

        match timeout(STARTUP_TIMEOUT, session.bridge.read_ready()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(E2eError::Playwright(format!(
                    "bridge not ready after {:?}",
                    STARTUP_TIMEOUT
                )))
            }
        }

        info!("Playwright {} session ready", config.kind.as_str());
        Ok(session)
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed() -> E2eResult<()> {
        let status = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn call(&mut self, cmd: &str, args: Value, limit: Duration) -> DriverResult<Value> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        self.bridge.call(cmd, args, limit).await
    }

    async fn action(&mut self, cmd: &str, args: Value) -> DriverResult<Value> {
        let limit = self.action_timeout;
        self.call(cmd, args, limit).await
    }
}

/// Playwright selector engine syntax for a target
fn selector(target: &Target) -> String {
    target.to_string()
}

fn as_bool(value: Value) -> DriverResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| DriverError::Failed(format!("expected boolean, got {}", value)))
}

fn as_string(value: Value) -> DriverResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Err(DriverError::Failed(format!("expected string, got {}", other))),
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> DriverResult<()> {
        let args = json!({ "url": url, "timeout": timeout.as_millis() as u64 });
        self.call("navigate", args, timeout).await.map(|_| ())
    }

    async fn reload(&mut self, timeout: Duration) -> DriverResult<()> {
        let args = json!({ "timeout": timeout.as_millis() as u64 });
        self.call("reload", args, timeout).await.map(|_| ())
    }

    async fn is_visible(&mut self, target: &Target) -> DriverResult<bool> {
        let value = self.action("is_visible", json!({ "selector": selector(target) })).await?;
        as_bool(value)
    }

    async fn is_present(&mut self, target: &Target) -> DriverResult<bool> {
        let value = self.action("is_present", json!({ "selector": selector(target) })).await?;
        as_bool(value)
    }

    async fn click(&mut self, target: &Target) -> DriverResult<()> {
        self.action("click", json!({ "selector": selector(target) }))
            .await
            .map(|_| ())
    }

    async fn fill_form(
        &mut self,
        form: &Target,
        fields: &BTreeMap<String, String>,
        submit: bool,
    ) -> DriverResult<()> {
        let args = json!({ "form": selector(form), "fields": fields, "submit": submit });
        self.action("fill_form", args).await.map(|_| ())
    }

    async fn enter_frame(&mut self, index: usize) -> DriverResult<()> {
        self.action("enter_frame", json!({ "index": index })).await.map(|_| ())
    }

    async fn exit_frame(&mut self) -> DriverResult<()> {
        self.action("exit_frame", Value::Null).await.map(|_| ())
    }

    async fn reset_frames(&mut self) -> DriverResult<()> {
        self.action("reset_frames", Value::Null).await.map(|_| ())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        let value = self.action("url", Value::Null).await?;
        as_string(value)
    }

    async fn current_title(&mut self) -> DriverResult<String> {
        let value = self.action("title", Value::Null).await?;
        as_string(value)
    }

    async fn text_of(&mut self, target: &Target) -> DriverResult<String> {
        let value = self.action("text_of", json!({ "selector": selector(target) })).await?;
        as_string(value)
    }

    async fn field_value(&mut self, name: &str) -> DriverResult<String> {
        let value = self.action("field_value", json!({ "name": name })).await?;
        as_string(value)
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }

        let result = self.action("close", Value::Null).await.map(|_| ());
        self.closed = true;

        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => debug!("Playwright bridge exited with {}", status),
            _ => {
                warn!("Playwright bridge did not exit, killing it");
                let _ = self.child.kill().await;
            }
        }

        result
    }
}
