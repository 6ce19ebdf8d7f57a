//! API grader - acceptance tests for the stock data REST API
//!
//! This library drives a running service through ordered, stateful suites,
//! validating every response against a JSON schema.

pub mod cli;
pub mod commands;
pub mod common;
pub mod http;
pub mod model;
pub mod schema;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use testing::{RunReport, Suite};
