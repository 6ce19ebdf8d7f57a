//! Response contracts of the graded API
//!
//! One flat draft-7 schema per endpoint shape. Schemas are built on demand and
//! never modified.

use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

use super::validator::{validate, ValidationReport};

/// Column of the price series endpoints (`/api/v2/{field}/{symbol}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    Close,
    High,
    Low,
}

impl PriceField {
    pub const ALL: [PriceField; 4] = [Self::Open, Self::Close, Self::High, Self::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::High => "high",
            Self::Low => "low",
        }
    }
}

impl FromStr for PriceField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::UnknownSchema(format!("price/{s}")))
    }
}

/// Every response shape the runner knows how to check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseSchema {
    // v1
    RowCount,
    UniqueStockCount,
    RowByMarketCount,
    // v2
    YearCount,
    Price(PriceField),
    // v3
    AccountCreation,
    AccountHoldings,
    StockList,
    AccountReturn,
    AccountsList,
    // v4
    BacktestResponse,
}

impl ResponseSchema {
    /// The whole catalog, in listing order
    pub fn all() -> Vec<ResponseSchema> {
        let mut all = vec![
            Self::RowCount,
            Self::UniqueStockCount,
            Self::RowByMarketCount,
            Self::YearCount,
        ];
        all.extend(PriceField::ALL.into_iter().map(Self::Price));
        all.extend([
            Self::AccountCreation,
            Self::AccountHoldings,
            Self::StockList,
            Self::AccountReturn,
            Self::AccountsList,
            Self::BacktestResponse,
        ]);
        all
    }

    /// Catalog name, e.g. `row_count` or `price/open`
    pub fn name(&self) -> String {
        match self {
            Self::RowCount => "row_count".to_string(),
            Self::UniqueStockCount => "unique_stock_count".to_string(),
            Self::RowByMarketCount => "row_by_market_count".to_string(),
            Self::YearCount => "year_count".to_string(),
            Self::Price(field) => format!("price/{}", field.as_str()),
            Self::AccountCreation => "account_creation".to_string(),
            Self::AccountHoldings => "account_holdings".to_string(),
            Self::StockList => "stock_list".to_string(),
            Self::AccountReturn => "account_return".to_string(),
            Self::AccountsList => "accounts_list".to_string(),
            Self::BacktestResponse => "back_test_response".to_string(),
        }
    }

    /// Draft-7 definition
    pub fn definition(&self) -> Value {
        match self {
            Self::RowCount => counter_schema("row_count"),
            Self::UniqueStockCount => counter_schema("unique_stock_count"),
            Self::RowByMarketCount => json!({
                "type": "object",
                "required": ["NASDAQ", "NYSE"],
                "properties": {
                    "NASDAQ": {"type": "integer", "minimum": 0},
                    "NYSE": {"type": "integer", "minimum": 0}
                },
                "additionalProperties": false
            }),
            Self::YearCount => json!({
                "type": "object",
                "required": ["year", "count"],
                "properties": {
                    "year": {"type": "integer", "minimum": 1900, "maximum": 2100},
                    "count": {"type": "integer", "minimum": 0}
                },
                "additionalProperties": false
            }),
            Self::Price(field) => price_schema(field.as_str()),
            Self::AccountCreation => json!({
                "type": "object",
                "required": ["account_id"],
                "properties": {"account_id": {"type": "integer", "minimum": 1}},
                "additionalProperties": false
            }),
            Self::AccountHoldings => json!({
                "type": "object",
                "required": ["account_id", "name", "stock_holdings"],
                "properties": {
                    "account_id": {"type": "integer", "minimum": 1},
                    "name": {"type": "string"},
                    "stock_holdings": {
                        "type": "array",
                        "items": holding_schema("symbol", json!({"type": "string"}))
                    }
                }
            }),
            Self::StockList => json!({
                "type": "object",
                "required": ["symbol", "holdings"],
                "properties": {
                    "symbol": {"type": "string"},
                    "holdings": {
                        "type": "array",
                        "items": holding_schema(
                            "account_id",
                            json!({"type": "integer", "minimum": 1})
                        )
                    }
                }
            }),
            Self::AccountReturn => json!({
                "type": "object",
                "required": ["account_id", "return"],
                "properties": {
                    "account_id": {"type": "integer", "minimum": 1},
                    "return": {"type": "number"}
                }
            }),
            Self::AccountsList => json!({
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["account_id", "name"],
                    "properties": {
                        "account_id": {"type": "integer", "minimum": 1},
                        "name": {"type": "string"}
                    }
                }
            }),
            Self::BacktestResponse => json!({
                "type": "object",
                "required": ["return", "num_observations"],
                "properties": {
                    "return": {"type": "number"},
                    "num_observations": {"type": "integer", "minimum": 0}
                },
                "additionalProperties": false
            }),
        }
    }

    /// Validate a response body; an absent body is checked as `null`
    pub fn validate(&self, body: Option<&Value>) -> Result<ValidationReport> {
        validate(body.unwrap_or(&Value::Null), &self.definition())
    }
}

impl fmt::Display for ResponseSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for ResponseSchema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .into_iter()
            .find(|schema| schema.name() == s)
            .ok_or_else(|| Error::UnknownSchema(s.to_string()))
    }
}

fn counter_schema(field: &str) -> Value {
    json!({
        "type": "object",
        "required": [field],
        "properties": {field: {"type": "integer", "minimum": 0}},
        "additionalProperties": false
    })
}

fn price_schema(field: &str) -> Value {
    json!({
        "type": "object",
        "required": ["symbol", "price_info"],
        "properties": {
            "symbol": {"type": "string"},
            "price_info": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["date", field],
                    "properties": {
                        "date": {"type": "string", "format": "date"},
                        field: {"type": "number"}
                    },
                    "additionalProperties": false
                }
            }
        },
        "additionalProperties": false
    })
}

/// One holding row; `owner` is `symbol` on account views and `account_id` on
/// stock views.
fn holding_schema(owner: &str, owner_schema: Value) -> Value {
    json!({
        "type": "object",
        "required": [owner, "purchase_date", "sale_date", "number_of_shares"],
        "properties": {
            owner: owner_schema,
            "purchase_date": {"type": "string", "format": "date"},
            "sale_date": {"type": "string", "format": "date"},
            "number_of_shares": {"type": "integer", "minimum": 1}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_schema_compiles() {
        for schema in ResponseSchema::all() {
            let result = schema.validate(Some(&json!({})));
            assert!(result.is_ok(), "{schema} failed to compile");
        }
    }

    #[test]
    fn test_names_round_trip_through_from_str() {
        for schema in ResponseSchema::all() {
            assert_eq!(schema.name().parse::<ResponseSchema>().unwrap(), schema);
        }
        assert!(matches!(
            "nope".parse::<ResponseSchema>(),
            Err(Error::UnknownSchema(_))
        ));
    }

    #[test]
    fn test_account_creation_requires_positive_id() {
        let schema = ResponseSchema::AccountCreation;
        assert!(schema.validate(Some(&json!({"account_id": 3}))).unwrap().is_valid());
        assert!(!schema.validate(Some(&json!({"account_id": 0}))).unwrap().is_valid());
        assert!(!schema
            .validate(Some(&json!({"account_id": 3, "name": "x"})))
            .unwrap()
            .is_valid());
    }

    #[test]
    fn test_year_bounds() {
        let schema = ResponseSchema::YearCount;
        assert!(schema
            .validate(Some(&json!({"year": 2019, "count": 252})))
            .unwrap()
            .is_valid());
        assert!(!schema
            .validate(Some(&json!({"year": 1800, "count": 0})))
            .unwrap()
            .is_valid());
    }

    #[test]
    fn test_price_schema_uses_requested_field() {
        let schema = ResponseSchema::Price(PriceField::High);
        let good =
            json!({"symbol": "MSFT", "price_info": [{"date": "2019-01-02", "high": 101.75}]});
        let wrong_field =
            json!({"symbol": "MSFT", "price_info": [{"date": "2019-01-02", "low": 98.94}]});
        assert!(schema.validate(Some(&good)).unwrap().is_valid());
        assert!(!schema.validate(Some(&wrong_field)).unwrap().is_valid());
    }

    #[test]
    fn test_holdings_missing_symbol_reported_once() {
        let body = json!({
            "account_id": 1,
            "name": "Test Account 1",
            "stock_holdings": [
                {"purchase_date": "2018-02-20", "sale_date": "2019-02-20", "number_of_shares": 100},
                {
                    "symbol": "AAPL",
                    "purchase_date": "2016-10-19",
                    "sale_date": "2016-10-27",
                    "number_of_shares": 50
                },
                {"purchase_date": "2016-09-08", "sale_date": "2016-09-14", "number_of_shares": 2}
            ]
        });
        let report = ResponseSchema::AccountHoldings.validate(Some(&body)).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("stock_holdings: "));
    }

    #[test]
    fn test_absent_body_is_invalid() {
        let report = ResponseSchema::BacktestResponse.validate(None).unwrap();
        assert!(!report.is_valid());
    }

    #[test]
    fn test_accounts_list_is_array() {
        let schema = ResponseSchema::AccountsList;
        assert!(schema
            .validate(Some(&json!([{"account_id": 1, "name": "a"}])))
            .unwrap()
            .is_valid());
        assert!(schema.validate(Some(&json!([]))).unwrap().is_valid());
        assert!(!schema.validate(Some(&json!({"account_id": 1}))).unwrap().is_valid());
    }
}
