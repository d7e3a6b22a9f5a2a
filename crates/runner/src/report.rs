//! Run results consumed by reporting front ends

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{E2eResult, ErrorKind, StepError};

/// Outcome of one `assert` step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionRecord {
    pub description: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

/// Why a scenario or phase failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: ErrorKind,
    /// Label of the step that failed
    pub step: String,
    pub message: String,
}

impl StepFailure {
    pub fn from_error(step: impl Into<String>, error: &StepError) -> Self {
        Self {
            kind: error.kind(),
            step: step.into(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub status: ScenarioStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    pub assertions: Vec<AssertionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
    pub steps_executed: usize,
    pub duration_ms: u64,
}

impl ScenarioReport {
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScenarioStatus::Skipped,
            skip_reason: Some(reason.into()),
            assertions: Vec::new(),
            failure: None,
            steps_executed: 0,
            duration_ms: 0,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }

    pub fn failed_assertions(&self) -> impl Iterator<Item = &AssertionRecord> {
        self.assertions.iter().filter(|a| !a.passed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    /// No steps were registered for this phase
    Empty,
    Passed,
    Failed,
}

/// Result of the setup or teardown phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub status: PhaseStatus,
    pub assertions: Vec<AssertionRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StepFailure>,
    pub duration_ms: u64,
}

impl PhaseReport {
    pub fn empty() -> Self {
        Self {
            status: PhaseStatus::Empty,
            assertions: Vec::new(),
            failure: None,
            duration_ms: 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == PhaseStatus::Failed
    }
}

/// Result of a whole suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub setup: PhaseReport,
    pub scenarios: Vec<ScenarioReport>,
    pub teardown: PhaseReport,
}

impl SuiteReport {
    pub fn new(
        started_at: DateTime<Utc>,
        duration_ms: u64,
        setup: PhaseReport,
        scenarios: Vec<ScenarioReport>,
        teardown: PhaseReport,
    ) -> Self {
        let count = |status| scenarios.iter().filter(|s| s.status == status).count();
        Self {
            started_at,
            duration_ms,
            total: scenarios.len(),
            passed: count(ScenarioStatus::Passed),
            failed: count(ScenarioStatus::Failed),
            skipped: count(ScenarioStatus::Skipped),
            setup,
            scenarios,
            teardown,
        }
    }

    /// True when no scenario failed and setup and teardown both succeeded
    pub fn success(&self) -> bool {
        self.failed == 0 && !self.setup.is_failed() && !self.teardown.is_failed()
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Write results to `<dir>/test-results.json`
    pub fn write_json(&self, dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("test-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
