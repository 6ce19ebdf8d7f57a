//! Scenario runner implementation
//!
//! Issues calls strictly one after another through an [`ApiTransport`],
//! prints a pass/fail line per step and records it in the run report. Step
//! failures never stop a run.

use colored::Colorize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::common::config::Expectations;
use crate::http::ApiTransport;
use crate::model;

use super::config::{EndpointCall, Suite};
use super::report::{RunReport, ScenarioReport, StepOutcome, StepRecord};
use super::scenarios;

/// Characters of a response body shown next to a result
const PREVIEW_CHARS: usize = 150;

/// Accounts created by the v3 suite
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreatedAccounts {
    pub first: Option<u64>,
    pub second: Option<u64>,
}

impl CreatedAccounts {
    pub fn is_empty(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }
}

/// State handed from one suite to later ones within a process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunContext {
    /// Set by v3, read by account-returns
    pub accounts: CreatedAccounts,
    /// v3 leaves its holdings and accounts in place; account-returns
    /// runs the v3 teardown after checking returns
    pub defer_teardown: bool,
}

/// Whether `actual` lies within `tolerance` of `expected`, boundary included
pub fn within_tolerance(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance
}

/// First 150 characters of the compact JSON body
pub fn preview(body: Option<&Value>) -> String {
    let text = body.map_or_else(|| "null".to_string(), Value::to_string);
    text.chars().take(PREVIEW_CHARS).collect()
}

/// Drives suites against one transport
pub struct ScenarioRunner<'t> {
    transport: &'t dyn ApiTransport,
    expectations: Expectations,
    context: RunContext,
    report: RunReport,
    current: Option<ScenarioReport>,
}

impl<'t> ScenarioRunner<'t> {
    pub fn new(transport: &'t dyn ApiTransport, expectations: Expectations) -> Self {
        Self {
            transport,
            expectations,
            context: RunContext::default(),
            report: RunReport::default(),
            current: None,
        }
    }

    /// Run the selected suites in order and return everything recorded
    ///
    /// When account-returns is selected after v3, the v3 accounts outlive
    /// their suite and are torn down once their returns have been checked.
    pub async fn run(mut self, suites: &[Suite]) -> RunReport {
        println!("\n{}", "Running comprehensive API tests...".blue().bold());
        for (index, suite) in suites.iter().enumerate() {
            if *suite == Suite::V3 {
                let returns_later = suites[index + 1..].contains(&Suite::AccountReturns);
                self.context.defer_teardown = returns_later;
            }
            self.run_suite(*suite).await;
        }
        self.into_report()
    }

    /// Run one suite, keeping the context for later suites
    pub async fn run_suite(&mut self, suite: Suite) {
        self.begin(suite);
        println!(
            "\n{} {}",
            "Running tests on".blue().bold(),
            suite.as_str().white().bold()
        );
        scenarios::run(self, suite).await;
        self.finish();
    }

    /// Open a scenario; steps are recorded into it until [`Self::finish`]
    pub fn begin(&mut self, suite: Suite) {
        self.finish();
        let mut scenario = ScenarioReport::new(suite);
        scenario.begin();
        self.current = Some(scenario);
    }

    /// Close the open scenario, if any
    pub fn finish(&mut self) {
        if let Some(mut scenario) = self.current.take() {
            scenario.complete();
            self.report.scenarios.push(scenario);
        }
    }

    /// Steps recorded so far, including the open scenario
    pub fn steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.report
            .steps()
            .chain(self.current.iter().flat_map(|s| s.steps.iter()))
    }

    pub fn into_report(mut self) -> RunReport {
        self.finish();
        self.report
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.context
    }

    pub fn expectations(&self) -> &Expectations {
        &self.expectations
    }

    pub fn transport(&self) -> &'t dyn ApiTransport {
        self.transport
    }

    /// Print a sub-heading inside a suite
    pub fn section(&self, title: &str) {
        println!("\n{}", title.cyan());
    }

    /// Issue a call and check it
    ///
    /// Unexpected status: failure, no schema check. Expected 2xx with a
    /// schema: the body is validated. Otherwise the status alone decides.
    /// Returns the body so later steps can pick identifiers out of it.
    pub async fn test_endpoint(&mut self, call: EndpointCall) -> Option<Value> {
        let transport = self.transport;
        self.test_endpoint_via(transport, call).await.0
    }

    /// [`Self::test_endpoint`] through another transport; also reports
    /// whether the step passed
    pub async fn test_endpoint_via(
        &mut self,
        transport: &dyn ApiTransport,
        call: EndpointCall,
    ) -> (Option<Value>, bool) {
        let label = call.label();
        println!("\n{} {}", "Testing".dimmed(), label);

        let response = transport
            .request(&call.path, call.method, call.body.as_ref(), &call.expected)
            .await;
        let status = response.status;

        if !call.expected.contains(&status) {
            self.fail(&label, Some(status), format!("Unexpected status code {status}"));
            return (None, false);
        }

        let passed = match call.schema {
            Some(schema) if response.is_success() => {
                let body_preview = preview(response.body.as_ref());
                match schema.validate(response.body.as_ref()) {
                    Ok(report) if report.is_valid() => {
                        self.pass(&label, Some(status), format!("Success: {body_preview}"));
                        true
                    }
                    Ok(report) => {
                        let reason = report.errors.join("; ");
                        self.fail(&label, Some(status), format!("{reason}: {body_preview}"));
                        false
                    }
                    Err(e) => {
                        self.fail(&label, Some(status), e.to_string());
                        false
                    }
                }
            }
            _ => {
                self.pass(&label, Some(status), format!("Status code {status} as expected"));
                true
            }
        };

        (response.body, passed)
    }

    /// Issue a call and, when it passed, convert the body into `T`
    ///
    /// A body that passed its schema but does not convert is a failed step.
    pub async fn fetch<T: DeserializeOwned>(&mut self, call: EndpointCall) -> Option<T> {
        let label = call.label();
        let transport = self.transport;
        let (body, passed) = self.test_endpoint_via(transport, call).await;
        if !passed {
            return None;
        }
        match model::decode(body.as_ref()) {
            Ok(value) => Some(value),
            Err(e) => {
                let target = model::type_label::<T>();
                self.fail(&label, None, format!("Response does not convert to {target}: {e}"));
                None
            }
        }
    }

    /// Record a step that could not run because earlier state is missing
    pub fn skip(&mut self, label: &str, reason: &str) {
        println!(
            "{} {}: skipped ({})",
            "-".yellow(),
            label,
            reason.yellow()
        );
        self.record(label, StepOutcome::Skipped, None, reason.to_string());
    }

    /// Stop the current scenario; remaining dependent work is not attempted
    pub fn abort(&mut self, reason: &str) {
        println!("{} {}", "Error:".red().bold(), reason);
        if let Some(scenario) = self.current.as_mut() {
            scenario.abort(reason);
        }
    }

    /// Compare against every accepted value; passing any one is enough
    pub fn check_tolerance(&mut self, label: &str, actual: f64, accepted: &[f64]) -> bool {
        let tolerance = self.expectations.tolerance;
        let matched = accepted
            .iter()
            .any(|expected| within_tolerance(actual, *expected, tolerance));

        if matched {
            self.pass(label, None, format!("test passed: {actual}"));
        } else {
            let expected = accepted
                .iter()
                .map(f64::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            self.fail(
                label,
                None,
                format!("test failed: Expected {expected} ± {tolerance}, got {actual}"),
            );
        }
        matched
    }

    /// Exact integer comparison
    pub fn check_exact(&mut self, label: &str, actual: u64, expected: u64) -> bool {
        if actual == expected {
            self.pass(label, None, format!("test passed: {actual}"));
            true
        } else {
            self.fail(
                label,
                None,
                format!("test failed: Expected {expected}, got {actual}"),
            );
            false
        }
    }

    /// Record a check whose outcome was decided by the caller
    pub fn check(&mut self, label: &str, ok: bool, detail: String) -> bool {
        if ok {
            self.pass(label, None, detail);
        } else {
            self.fail(label, None, detail);
        }
        ok
    }

    fn pass(&mut self, label: &str, status: Option<u16>, detail: String) {
        println!("{} {}: {}", "✓".green(), label, detail);
        self.record(label, StepOutcome::Passed, status, detail);
    }

    fn fail(&mut self, label: &str, status: Option<u16>, detail: String) {
        println!("{} {}: {}", "✗".red(), label, detail);
        self.record(label, StepOutcome::Failed, status, detail);
    }

    fn record(&mut self, label: &str, outcome: StepOutcome, status: Option<u16>, detail: String) {
        let step = StepRecord {
            label: label.to_string(),
            outcome,
            status,
            detail,
        };
        match self.current.as_mut() {
            Some(scenario) => scenario.record(step),
            None => warn!(label, "Step finished outside of a scenario, not recorded"),
        }
    }
}
