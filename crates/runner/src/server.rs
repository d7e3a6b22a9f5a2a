//! System-under-test server - spawning and health checking the CMS dev server

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Handle to a running server process
pub struct ServerHandle {
    child: Child,
    health_url: String,
}

impl ServerHandle {
    /// Spawn the configured command and wait until `base_url` answers
    pub async fn spawn(config: &ServerConfig, base_url: &str) -> E2eResult<Self> {
        let (program, args) = config.command.split_first().ok_or_else(|| {
            E2eError::Configuration("server.command must not be empty".to_string())
        })?;

        info!("Spawning CMS server: {}", config.command.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(args).envs(&config.env);

        if let Some(dir) = &config.workdir {
            cmd.current_dir(dir);
        }

        cmd.stdout(Stdio::null()).stderr(Stdio::inherit());

        let child = cmd.spawn().map_err(|e| {
            E2eError::ServerStartup(format!("Failed to spawn {}: {}", program, e))
        })?;

        let health_url = format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            if config.health_path.starts_with('/') {
                config.health_path.clone()
            } else {
                format!("/{}", config.health_path)
            }
        );

        let handle = ServerHandle { child, health_url };

        handle.wait_for_healthy(config.startup_timeout()).await?;

        info!("Server is healthy at {}", handle.health_url);
        Ok(handle)
    }

    /// Wait for the server to respond to health checks
    async fn wait_for_healthy(&self, timeout_duration: Duration) -> E2eResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match client.get(&self.health_url).send().await {
                // Redirects to a login page still mean the app is up
                Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Health check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for server to start...");
                    }
                    if !e.is_connect() {
                        warn!("Health check error: {}", e);
                    }
                }
            }

            sleep(Duration::from_millis(250)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }

    /// Stop the server
    pub fn stop(&mut self) -> E2eResult<()> {
        if let Ok(Some(_)) = self.child.try_wait() {
            return Ok(());
        }

        info!("Stopping server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        let _ = self.child.wait();

        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Configuration for spawning the CMS under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Program and arguments, e.g. `["python", "manage.py", "runserver", "8000"]`
    pub command: Vec<String>,

    /// Working directory for the command
    #[serde(default)]
    pub workdir: Option<PathBuf>,

    /// Extra environment variables
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Path polled until the server answers
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Timeout for server startup
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_startup_timeout_ms() -> u64 {
    30_000
}

impl ServerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }
}
