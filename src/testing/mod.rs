//! API acceptance test runner
//!
//! Drives the graded service through ordered, stateful suites, validating
//! each response against its schema and checking computed returns with a
//! tolerance.

mod config;
mod report;
mod runner;
mod scenarios;

#[cfg(test)]
pub(crate) mod fake;

pub use config::*;
pub use report::*;
pub use runner::{preview, within_tolerance, CreatedAccounts, RunContext, ScenarioRunner};
