//! Step and scenario results

use serde::Serialize;
use std::path::Path;

use crate::common::Result;

use super::config::Suite;

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Passed,
    Failed,
    /// A precondition from an earlier step was missing; no request was sent
    Skipped,
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub label: String,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub detail: String,
}

/// Lifecycle of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScenarioState {
    NotStarted,
    Running,
    Completed,
    Aborted { reason: String },
}

/// Everything recorded while one suite ran
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub suite: Suite,
    #[serde(flatten)]
    pub state: ScenarioState,
    pub steps: Vec<StepRecord>,
}

impl ScenarioReport {
    pub fn new(suite: Suite) -> Self {
        Self {
            suite,
            state: ScenarioState::NotStarted,
            steps: Vec::new(),
        }
    }

    pub fn begin(&mut self) {
        if self.state == ScenarioState::NotStarted {
            self.state = ScenarioState::Running;
        }
    }

    /// Finish normally; an aborted scenario stays aborted
    pub fn complete(&mut self) {
        if self.state == ScenarioState::Running {
            self.state = ScenarioState::Completed;
        }
    }

    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.state == ScenarioState::Running {
            self.state = ScenarioState::Aborted {
                reason: reason.into(),
            };
        }
    }

    pub fn record(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for step in &self.steps {
            tally.add(step.outcome);
        }
        tally
    }
}

/// Step counts by outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Tally {
    fn add(&mut self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Passed => self.passed += 1,
            StepOutcome::Failed => self.failed += 1,
            StepOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub scenarios: Vec<ScenarioReport>,
}

impl RunReport {
    pub fn tally(&self) -> Tally {
        let mut tally = Tally::default();
        for step in self.scenarios.iter().flat_map(|s| &s.steps) {
            tally.add(step.outcome);
        }
        tally
    }

    /// Every step of every scenario, in execution order
    pub fn steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.scenarios.iter().flat_map(|s| s.steps.iter())
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
