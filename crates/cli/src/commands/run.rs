//! Run the suite against a CMS through Playwright

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use pagectl_runner::report::PhaseReport;
use pagectl_runner::server::ServerHandle;
use pagectl_runner::{
    PlaywrightSession, ScenarioReport, ScenarioStatus, Session, SuiteConfig, SuiteEvent,
    SuiteReport,
};

use super::{assemble, Selection};
use crate::output::{
    print_info, print_json, print_list, print_warning, print_yaml, OutputFormat, TableDisplay,
};

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Root URL of the site, including the language prefix
    #[arg(long, env = "PAGECTL_BASE_URL")]
    pub base_url: Option<String>,

    /// Admin user name
    #[arg(long, env = "PAGECTL_USERNAME")]
    pub username: Option<String>,

    /// Admin password
    #[arg(long, env = "PAGECTL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    pub browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Run scenarios that are disabled by default
    #[arg(long)]
    pub include_disabled: bool,

    /// Directory of additional YAML scenarios
    #[arg(long)]
    pub specs: Option<PathBuf>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Output directory for results
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Deadline for setup and scenarios, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not launch the configured development server
    #[arg(long)]
    pub no_server: bool,
}

impl RunArgs {
    pub fn selection(&self) -> Selection {
        Selection {
            specs: self.specs.clone(),
            tag: self.tag.clone(),
            include_disabled: self.include_disabled,
        }
    }

    /// Apply flag overrides on top of the file configuration
    pub fn apply(&self, config: &mut SuiteConfig) -> Result<()> {
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(username) = &self.username {
            config.credentials.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.credentials.password = password.clone();
        }
        if let Some(browser) = &self.browser {
            config.browser.kind = browser.parse()?;
        }
        if self.headed {
            config.browser.headless = false;
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeouts.suite_ms = Some(secs.saturating_mul(1_000));
        }
        if self.no_server {
            config.server = None;
        }
        config.validate()?;
        Ok(())
    }
}

/// Scenario result row
#[derive(Debug, Serialize)]
pub struct ScenarioRow {
    pub name: String,
    pub status: ScenarioStatus,
    pub assertions: String,
    pub duration_ms: u64,
    pub detail: String,
}

impl From<&ScenarioReport> for ScenarioRow {
    fn from(report: &ScenarioReport) -> Self {
        let passed = report.assertions.iter().filter(|a| a.passed).count();
        let detail = match (&report.failure, &report.skip_reason) {
            (Some(failure), _) => format!("{}: {}", failure.kind, failure.message),
            (None, Some(reason)) => reason.clone(),
            (None, None) => String::new(),
        };
        Self {
            name: report.name.clone(),
            status: report.status,
            assertions: format!("{}/{}", passed, report.assertions.len()),
            duration_ms: report.duration_ms,
            detail,
        }
    }
}

impl TableDisplay for ScenarioRow {
    fn headers() -> Vec<&'static str> {
        vec!["Scenario", "Status", "Assertions", "Duration", "Detail"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            status_label(self.status),
            self.assertions.clone(),
            format!("{} ms", self.duration_ms),
            self.detail.clone(),
        ]
    }
}

fn status_label(status: ScenarioStatus) -> String {
    match status {
        ScenarioStatus::Passed => "✓ passed".green().to_string(),
        ScenarioStatus::Failed => "✗ failed".red().to_string(),
        ScenarioStatus::Skipped => "- skipped".yellow().to_string(),
    }
}

fn print_event(event: &SuiteEvent) {
    match event {
        SuiteEvent::SetupFinished(phase) => print_phase("setup", phase),
        SuiteEvent::ScenarioStarted { name } => println!("{} {}", "▶".cyan(), name.bold()),
        SuiteEvent::ScenarioFinished(report) => match report.status {
            ScenarioStatus::Passed => println!(
                "  {} {} {}",
                "✓".green(),
                report.name,
                format!("({} ms)", report.duration_ms).dimmed()
            ),
            ScenarioStatus::Failed => {
                println!("  {} {}", "✗".red(), report.name);
                for assertion in report.failed_assertions() {
                    println!(
                        "      {} (expected {}, got {})",
                        assertion.description, assertion.expected, assertion.actual
                    );
                }
                if let Some(failure) = &report.failure {
                    println!("      {} at {}", failure.message, failure.step.dimmed());
                }
            }
            ScenarioStatus::Skipped => println!(
                "{} {} {}",
                "-".yellow(),
                report.name,
                format!("({})", report.skip_reason.as_deref().unwrap_or("skipped")).dimmed()
            ),
        },
        SuiteEvent::TeardownFinished(phase) => print_phase("teardown", phase),
    }
}

fn print_phase(name: &str, phase: &PhaseReport) {
    if phase.is_failed() {
        let message = phase
            .failure
            .as_ref()
            .map(|f| f.message.as_str())
            .unwrap_or("failed");
        println!("{} {} failed: {}", "✗".red(), name, message);
    }
}

fn print_summary(report: &SuiteReport) {
    let line = format!(
        "{} passed, {} failed, {} skipped in {:.1}s",
        report.passed,
        report.failed,
        report.skipped,
        report.duration_ms as f64 / 1000.0
    );
    if report.success() {
        println!("{} {}", "✓".green(), line);
    } else {
        println!("{} {}", "✗".red(), line);
    }
}

/// Run the suite. `Ok(false)` means it ran but something failed.
pub async fn execute(args: RunArgs, config: SuiteConfig, format: OutputFormat) -> Result<bool> {
    let mut suite = assemble(&config, &args.selection())?;

    let _server = match &config.server {
        Some(server) => Some(
            ServerHandle::spawn(server, &config.base_url)
                .await
                .context("starting the development server")?,
        ),
        None => None,
    };

    let driver = PlaywrightSession::launch(&config.browser, &config.timeouts)
        .await
        .context("launching the browser")?;
    let mut session = Session::new(driver);

    let printer = if format.is_human() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        suite.with_events(tx);
        Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                print_event(&event);
            }
        }))
    } else {
        None
    };

    info!("Running suite against {}", config.base_url);
    let result = suite.run(&mut session).await;
    drop(suite);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    if let Err(e) = session.close().await {
        print_warning(&format!("failed to close the browser: {}", e));
    }
    let report = result?;

    let path = report.write_json(&config.output_dir)?;

    let rows: Vec<ScenarioRow> = report.scenarios.iter().map(ScenarioRow::from).collect();
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Yaml => print_yaml(&report),
        OutputFormat::Table | OutputFormat::Plain => {
            println!();
            print_list(&rows, format);
            print_summary(&report);
            print_info(&format!("Results written to {}", path.display()));
        }
    }

    Ok(report.success())
}
