//! Typed payloads of the graded API
//!
//! Requests are built from these types. Responses are only converted into them
//! after they passed their schema, so later steps never poke at raw JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// `POST /api/v3/accounts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
}

/// `DELETE /api/v3/accounts`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub account_id: u64,
}

/// `POST` and `DELETE /api/v3/stocks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    pub account_id: u64,
    pub symbol: String,
    pub purchase_date: String,
    pub sale_date: String,
    pub number_of_shares: u64,
}

/// `POST /api/v4/back_test`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub value_1: String,
    pub value_2: String,
    pub operator: String,
    pub purchase_type: String,
    pub start_date: String,
    pub end_date: String,
}

impl BacktestRequest {
    /// Buy when the open is below the close, over `[start_date, end_date]`
    pub fn open_below_close(start_date: &str, end_date: &str) -> Self {
        Self {
            value_1: "O1".to_string(),
            value_2: "C1".to_string(),
            operator: "LT".to_string(),
            purchase_type: "B".to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
        }
    }
}

/// Body of a successful account creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreated {
    pub account_id: u64,
}

/// One row of an account's holdings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub purchase_date: String,
    pub sale_date: String,
    pub number_of_shares: u64,
}

/// `GET /api/v3/accounts/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHoldings {
    pub account_id: u64,
    pub name: String,
    pub stock_holdings: Vec<Holding>,
}

/// `GET /api/v3/accounts/return/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountReturn {
    pub account_id: u64,
    #[serde(rename = "return")]
    pub value: f64,
}

/// Body of a successful backtest
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(rename = "return")]
    pub value: f64,
    pub num_observations: u64,
}

/// Convert a validated body into its typed form; a missing body reads as `null`
pub fn decode<T: DeserializeOwned>(body: Option<&serde_json::Value>) -> serde_json::Result<T> {
    T::deserialize(body.unwrap_or(&serde_json::Value::Null))
}

/// Short name of a payload type, e.g. `AccountCreated`
pub fn type_label<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Serialize a request payload
pub fn encode<T: Serialize>(payload: &T) -> serde_json::Value {
    serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)
}
