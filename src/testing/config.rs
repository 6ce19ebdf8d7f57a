//! Suite selection and endpoint call definitions

use serde::Serialize;
use std::fmt;

use crate::http::Method;
use crate::schema::ResponseSchema;

/// A group of steps exercising one API family end-to-end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Suite {
    /// Row counts under /api/v1
    V1,
    /// Years and price series under /api/v2, including the bad-key probe
    V2,
    /// Account and holdings lifecycle under /api/v3
    V3,
    /// Backtests under /api/v4
    V4,
    /// Only the bad-key probe
    InvalidKey,
    /// Return values of the accounts created by v3 (run after v3)
    AccountReturns,
    /// Exact backtest observation count and return
    BacktestExact,
}

impl Suite {
    /// Suites run when none are selected
    pub const DEFAULT: [Suite; 6] = [
        Self::V1,
        Self::V2,
        Self::V3,
        Self::V4,
        Self::InvalidKey,
        Self::BacktestExact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
            Self::V3 => "v3",
            Self::V4 => "v4",
            Self::InvalidKey => "invalid-key",
            Self::AccountReturns => "account-returns",
            Self::BacktestExact => "backtest-exact",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request the runner issues, with what it expects back
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointCall {
    pub path: String,
    pub method: Method,
    pub body: Option<serde_json::Value>,
    /// Checked only when the status is expected and 2xx
    pub schema: Option<ResponseSchema>,
    pub expected: Vec<u16>,
}

impl EndpointCall {
    /// Call expecting `200` and no schema
    pub fn new(method: Method, path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            path: path.into(),
            method,
            body,
            schema: None,
            expected: vec![200],
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, None)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, path, Some(body))
    }

    pub fn delete(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Delete, path, Some(body))
    }

    pub fn schema(mut self, schema: ResponseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Replace the expected status set (default `[200]`)
    pub fn expect(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.expected = statuses.into_iter().collect();
        self
    }

    /// `METHOD path`, used in every output line
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}
