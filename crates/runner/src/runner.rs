//! Suite runner: setup, scenarios in registration order, teardown

use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

use crate::config::SuiteConfig;
use crate::error::{DriverError, E2eError, E2eResult, ErrorKind, StepError};
use crate::report::{
    AssertionRecord, PhaseReport, PhaseStatus, ScenarioReport, ScenarioStatus, StepFailure,
    SuiteReport,
};
use crate::session::Session;
use crate::spec::{Action, Check, Condition, Scenario, Step};

const DEADLINE_EXCEEDED: &str = "suite deadline exceeded";

/// Progress notifications emitted while a suite runs
#[derive(Debug, Clone)]
pub enum SuiteEvent {
    SetupFinished(PhaseReport),
    ScenarioStarted { name: String },
    ScenarioFinished(ScenarioReport),
    TeardownFinished(PhaseReport),
}

/// Ordered collection of scenarios plus optional setup and teardown
pub struct Suite {
    config: SuiteConfig,
    setup: Vec<Step>,
    teardown: Vec<Step>,
    scenarios: Vec<Scenario>,
    run_skipped: bool,
    events: Option<UnboundedSender<SuiteEvent>>,
}

impl Suite {
    pub fn new(config: SuiteConfig) -> Self {
        Self {
            config,
            setup: Vec::new(),
            teardown: Vec::new(),
            scenarios: Vec::new(),
            run_skipped: false,
            events: None,
        }
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn setup_steps(&self) -> &[Step] {
        &self.setup
    }

    pub fn teardown_steps(&self) -> &[Step] {
        &self.teardown
    }

    pub fn register_setup(&mut self, steps: Vec<Step>) -> E2eResult<()> {
        validate_patterns(&steps)?;
        self.setup = steps;
        Ok(())
    }

    pub fn register_teardown(&mut self, steps: Vec<Step>) -> E2eResult<()> {
        validate_patterns(&steps)?;
        self.teardown = steps;
        Ok(())
    }

    pub fn register_scenario(&mut self, name: impl Into<String>, steps: Vec<Step>) -> E2eResult<()> {
        self.register(Scenario::new(name, steps))
    }

    /// Register a scenario that is reported as skipped unless
    /// [`Suite::include_skipped`] is set
    pub fn register_skipped(
        &mut self,
        name: impl Into<String>,
        reason: impl Into<String>,
        steps: Vec<Step>,
    ) -> E2eResult<()> {
        self.register(Scenario::new(name, steps).skipped(reason))
    }

    pub fn register(&mut self, scenario: Scenario) -> E2eResult<()> {
        if scenario.name.trim().is_empty() {
            return Err(E2eError::Configuration("scenario name must not be empty".to_string()));
        }
        if self.scenarios.iter().any(|s| s.name == scenario.name) {
            return Err(E2eError::Configuration(format!(
                "duplicate scenario name: {:?}",
                scenario.name
            )));
        }
        validate_patterns(&scenario.steps)?;
        self.scenarios.push(scenario);
        Ok(())
    }

    /// Execute scenarios marked as skipped as well
    pub fn include_skipped(&mut self, include: bool) -> &mut Self {
        self.run_skipped = include;
        self
    }

    /// Stream progress events to `tx`
    pub fn with_events(&mut self, tx: UnboundedSender<SuiteEvent>) -> &mut Self {
        self.events = Some(tx);
        self
    }

    fn emit(&self, event: SuiteEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Run setup, every scenario in registration order, then teardown.
    ///
    /// Teardown runs exactly once whatever happened before it. Only an
    /// invalid configuration produces an `Err`; everything else is reported.
    pub async fn run(&self, session: &mut Session) -> E2eResult<SuiteReport> {
        self.config.validate()?;

        let started_at = Utc::now();
        let start = Instant::now();
        let deadline = self.config.timeouts.suite().and_then(|d| start.checked_add(d));

        info!("Running {} scenario(s)...", self.scenarios.len());

        let setup = self.run_phase("setup", &self.setup, session, deadline).await;
        self.emit(SuiteEvent::SetupFinished(setup.clone()));

        let mut scenarios = Vec::with_capacity(self.scenarios.len());
        let mut abort_reason: Option<&str> = None;

        if setup.is_failed() {
            error!("Setup failed, no scenarios will run");
            let cancelled = setup.failure.as_ref().map(|f| f.kind) == Some(ErrorKind::Cancelled);
            abort_reason = Some(if cancelled { DEADLINE_EXCEEDED } else { "setup failed" });
        }

        for scenario in &self.scenarios {
            if abort_reason.is_none() && deadline.map(|d| Instant::now() >= d).unwrap_or(false) {
                abort_reason = Some(DEADLINE_EXCEEDED);
            }

            if let Some(reason) = abort_reason {
                let report = ScenarioReport::skipped(&scenario.name, reason);
                self.emit(SuiteEvent::ScenarioFinished(report.clone()));
                scenarios.push(report);
                continue;
            }

            if let (Some(reason), false) = (&scenario.skip, self.run_skipped) {
                info!("- {} (skipped: {})", scenario.name, reason);
                let report = ScenarioReport::skipped(&scenario.name, reason.clone());
                self.emit(SuiteEvent::ScenarioFinished(report.clone()));
                scenarios.push(report);
                continue;
            }

            self.emit(SuiteEvent::ScenarioStarted { name: scenario.name.clone() });
            let report = self.run_scenario(scenario, session, deadline).await;

            match report.status {
                ScenarioStatus::Passed => {
                    info!("✓ {} ({} ms)", report.name, report.duration_ms)
                }
                _ => error!(
                    "✗ {} - {}",
                    report.name,
                    report.failure.as_ref().map(|f| f.message.as_str()).unwrap_or("failed")
                ),
            }

            if report.failure.as_ref().map(|f| f.kind) == Some(ErrorKind::Cancelled) {
                abort_reason = Some(DEADLINE_EXCEEDED);
            }

            self.emit(SuiteEvent::ScenarioFinished(report.clone()));
            scenarios.push(report);
        }

        let teardown = self.run_phase("teardown", &self.teardown, session, None).await;
        if teardown.is_failed() {
            warn!(
                "Teardown failed: {}",
                teardown.failure.as_ref().map(|f| f.message.as_str()).unwrap_or("assertion failed")
            );
        }
        self.emit(SuiteEvent::TeardownFinished(teardown.clone()));

        let duration_ms = start.elapsed().as_millis() as u64;
        let report = SuiteReport::new(started_at, duration_ms, setup, scenarios, teardown);

        info!(
            "Suite results: {} passed, {} failed, {} skipped ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );

        Ok(report)
    }

    async fn run_phase(
        &self,
        phase: &str,
        steps: &[Step],
        session: &mut Session,
        deadline: Option<Instant>,
    ) -> PhaseReport {
        if steps.is_empty() {
            return PhaseReport::empty();
        }

        debug!("Running {}", phase);
        let outcome = self.execute(steps, session, deadline).await;

        let status = if outcome.failure.is_some() || outcome.assertions.iter().any(|a| !a.passed) {
            PhaseStatus::Failed
        } else {
            PhaseStatus::Passed
        };

        PhaseReport {
            status,
            failure: outcome.failure.or_else(|| assertion_failure(&outcome.assertions)),
            assertions: outcome.assertions,
            duration_ms: outcome.duration_ms,
        }
    }

    async fn run_scenario(
        &self,
        scenario: &Scenario,
        session: &mut Session,
        deadline: Option<Instant>,
    ) -> ScenarioReport {
        debug!("Running scenario: {}", scenario.name);
        let outcome = self.execute(&scenario.steps, session, deadline).await;

        let failure = outcome.failure.or_else(|| assertion_failure(&outcome.assertions));
        let status = if failure.is_some() {
            ScenarioStatus::Failed
        } else {
            ScenarioStatus::Passed
        };

        ScenarioReport {
            name: scenario.name.clone(),
            status,
            skip_reason: None,
            assertions: outcome.assertions,
            failure,
            steps_executed: outcome.steps_executed,
            duration_ms: outcome.duration_ms,
        }
    }

    /// Execute a step list, bounded by `deadline`, always leaving the
    /// session in the top-level document
    async fn execute(
        &self,
        steps: &[Step],
        session: &mut Session,
        deadline: Option<Instant>,
    ) -> Outcome {
        let start = Instant::now();
        let mut exec = Executor::new(&self.config, session);

        let result = match deadline {
            Some(deadline) => {
                let bounded = timeout_at(deadline, exec.run_steps(steps)).await;
                match bounded {
                    Ok(result) => result,
                    Err(_) => Err(Failed {
                        step: exec.current.clone().unwrap_or_else(|| "<deadline>".to_string()),
                        error: StepError::Cancelled,
                    }),
                }
            }
            None => exec.run_steps(steps).await,
        };

        let Executor { assertions, steps_executed, session, .. } = exec;

        if session.frame_depth() > 0 || result.is_err() {
            session.reset_context().await;
        }

        Outcome {
            assertions,
            steps_executed,
            failure: result.err().map(|f| StepFailure::from_error(f.step, &f.error)),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

struct Outcome {
    assertions: Vec<AssertionRecord>,
    steps_executed: usize,
    failure: Option<StepFailure>,
    duration_ms: u64,
}

fn assertion_failure(assertions: &[AssertionRecord]) -> Option<StepFailure> {
    let failed: Vec<&AssertionRecord> = assertions.iter().filter(|a| !a.passed).collect();
    let first = failed.first()?;
    Some(StepFailure {
        kind: ErrorKind::AssertionFailed,
        step: format!("assert:{}", first.description),
        message: format!(
            "{} of {} assertion(s) failed; first: {} (expected {}, got {})",
            failed.len(),
            assertions.len(),
            first.description,
            first.expected,
            first.actual
        ),
    })
}

/// A fatal step error together with the label of the step that raised it
struct Failed {
    step: String,
    error: StepError,
}

/// Interprets steps against the session, collecting assertion records
struct Executor<'a> {
    config: &'a SuiteConfig,
    session: &'a mut Session,
    assertions: Vec<AssertionRecord>,
    steps_executed: usize,
    current: Option<String>,
}

impl<'a> Executor<'a> {
    fn new(config: &'a SuiteConfig, session: &'a mut Session) -> Self {
        Self {
            config,
            session,
            assertions: Vec::new(),
            steps_executed: 0,
            current: None,
        }
    }

    fn run_steps<'b>(&'b mut self, steps: &'b [Step]) -> BoxFuture<'b, Result<(), Failed>>
    where
        'a: 'b,
    {
        async move {
            for step in steps {
                self.run_step(step).await?;
            }
            Ok(())
        }
        .boxed()
    }

    async fn run_step(&mut self, step: &Step) -> Result<(), Failed> {
        let label = step.label();
        debug!("Executing step: {}", label);
        self.current = Some(label.clone());
        self.steps_executed += 1;

        let fail = |error: StepError| Failed { step: label.clone(), error };

        match step {
            Step::Navigate { url, timeout_ms } => {
                let url = self.config.resolve(url);
                let limit = self.navigation_timeout(*timeout_ms);
                let result = timeout(limit, self.session.driver().navigate(&url, limit)).await;
                navigation_result(result, &url, limit).map_err(fail)
            }
            Step::Reload { timeout_ms } => {
                let limit = self.navigation_timeout(*timeout_ms);
                let result = timeout(limit, self.session.driver().reload(limit)).await;
                navigation_result(result, "<reload>", limit).map_err(fail)
            }
            Step::WaitFor { condition, timeout_ms } => {
                let limit = timeout_ms.map(Duration::from_millis).unwrap_or(self.config.timeouts.wait());
                self.wait_for(condition, limit).await.map_err(fail)
            }
            Step::Interact { action, target } => {
                let driver = self.session.driver();
                let result = match action {
                    Action::Click => driver.click(target).await,
                    Action::Fill { fields, submit } => driver.fill_form(target, fields, *submit).await,
                };
                result.map_err(|e| fail(e.into()))
            }
            Step::EnterFrame { index, steps } => {
                self.session.enter_frame(*index).await.map_err(|e| fail(e.into()))?;
                let nested = self.run_steps(steps).await;
                let restored = self.session.exit_frame().await;
                nested?;
                restored.map_err(|e| fail(e.into()))
            }
            Step::Assert { check, description } => {
                let record = match self.evaluate(check, description).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("  ✗ {} ({})", description, e);
                        self.assertions.push(AssertionRecord {
                            description: description.to_string(),
                            passed: false,
                            expected: check.expected(),
                            actual: format!("<error: {}>", e),
                        });
                        return Err(fail(e));
                    }
                };
                if record.passed {
                    info!("  ✓ {}", record.description);
                } else {
                    warn!(
                        "  ✗ {} (expected {}, got {})",
                        record.description, record.expected, record.actual
                    );
                }
                self.assertions.push(record);
                Ok(())
            }
            Step::Group { name, steps } => {
                debug!("Entering {}", name);
                self.run_steps(steps).await
            }
        }
    }

    fn navigation_timeout(&self, timeout_ms: Option<u64>) -> Duration {
        timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.config.timeouts.navigation())
    }

    async fn wait_for(&mut self, condition: &Condition, limit: Duration) -> Result<(), StepError> {
        let deadline = Instant::now() + limit;
        let poll = self.config.timeouts.poll_interval();

        loop {
            if self.condition_holds(condition).await? {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(StepError::WaitTimeout {
                    condition: condition.to_string(),
                    timeout_ms: limit.as_millis() as u64,
                });
            }

            sleep(poll.min(deadline - now)).await;
        }
    }

    async fn condition_holds(&mut self, condition: &Condition) -> Result<bool, StepError> {
        let driver = self.session.driver();
        let result = match condition {
            Condition::Visible(target) => driver.is_visible(target).await,
            Condition::Present(target) => driver.is_present(target).await,
            Condition::UrlMatches(pattern) => {
                let re = compile(pattern)?;
                driver.current_url().await.map(|url| re.is_match(&url))
            }
        };

        match result {
            Ok(holds) => Ok(holds),
            Err(DriverError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Evaluate a check. A missing element yields a failed record; any other
    /// driver error is fatal once the caller has recorded it.
    async fn evaluate(&mut self, check: &Check, description: &str) -> Result<AssertionRecord, StepError> {
        let driver = self.session.driver();
        let evaluated: Result<(bool, String), DriverError> = match check {
            Check::TitleMatches(pattern) => {
                let re = compile(pattern)?;
                driver.current_title().await.map(|t| (re.is_match(&t), format!("{:?}", t)))
            }
            Check::UrlMatches(pattern) => {
                let re = compile(pattern)?;
                driver.current_url().await.map(|u| (re.is_match(&u), format!("{:?}", u)))
            }
            Check::FieldEquals { name, value } => driver
                .field_value(name)
                .await
                .map(|v| (&v == value, format!("{:?}", v))),
            Check::HasText { target, text } => driver
                .text_of(target)
                .await
                .map(|t| (t.contains(text.as_str()), format!("{:?}", t))),
            Check::Visible(target) => driver.is_visible(target).await.map(|visible| {
                (visible, if visible { "visible" } else { "hidden" }.to_string())
            }),
        };

        let (passed, actual) = match evaluated {
            Ok(outcome) => outcome,
            Err(DriverError::NotFound(_)) => (false, "<missing>".to_string()),
            Err(e) => return Err(e.into()),
        };

        Ok(AssertionRecord {
            description: description.to_string(),
            passed,
            expected: check.expected(),
            actual,
        })
    }
}

fn navigation_result(
    result: Result<Result<(), DriverError>, tokio::time::error::Elapsed>,
    url: &str,
    limit: Duration,
) -> Result<(), StepError> {
    let timed_out = || StepError::NavigationTimeout {
        url: url.to_string(),
        timeout_ms: limit.as_millis() as u64,
    };

    match result {
        Err(_) | Ok(Err(DriverError::Timeout(_))) => Err(timed_out()),
        Ok(Err(e)) => Err(e.into()),
        Ok(Ok(())) => Ok(()),
    }
}

fn compile(pattern: &str) -> Result<Regex, StepError> {
    Regex::new(pattern).map_err(|e| StepError::InteractionFailed(format!("invalid pattern: {}", e)))
}

/// Reject regular expressions that would only fail at run time
fn validate_patterns(steps: &[Step]) -> E2eResult<()> {
    for step in steps {
        let pattern = match step {
            Step::WaitFor { condition: Condition::UrlMatches(p), .. } => Some(p),
            Step::Assert { check: Check::TitleMatches(p), .. }
            | Step::Assert { check: Check::UrlMatches(p), .. } => Some(p),
            Step::EnterFrame { steps, .. } | Step::Group { steps, .. } => {
                validate_patterns(steps)?;
                None
            }
            _ => None,
        };

        if let Some(pattern) = pattern {
            Regex::new(pattern).map_err(|e| {
                E2eError::Configuration(format!("invalid pattern {:?}: {}", pattern, e))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::Target;

    #[test]
    fn test_duplicate_scenario_rejected() {
        let mut suite = Suite::new(SuiteConfig::default());
        suite.register_scenario("a", vec![]).unwrap();
        let err = suite.register_scenario("a", vec![]).unwrap_err();
        assert!(matches!(err, E2eError::Configuration(_)));
        assert_eq!(suite.scenarios().len(), 1);
    }

    #[test]
    fn test_invalid_nested_pattern_rejected() {
        let mut suite = Suite::new(SuiteConfig::default());
        let steps = vec![Step::in_frame(
            0,
            vec![Step::assert(Check::UrlMatches("(".to_string()), "broken")],
        )];
        assert!(matches!(
            suite.register_scenario("bad", steps),
            Err(E2eError::Configuration(_))
        ));
    }

    #[test]
    fn test_skipped_registration_keeps_reason() {
        let mut suite = Suite::new(SuiteConfig::default());
        suite
            .register_skipped("later", "disabled", vec![Step::click(Target::css("a"))])
            .unwrap();
        assert_eq!(suite.scenarios()[0].skip.as_deref(), Some("disabled"));
    }
}
