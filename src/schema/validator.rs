//! Draft-7 validation with deduplicated, capped error lists
//!
//! A list endpoint where every item misses the same field should report the
//! problem once, not once per item. Array indices are therefore stripped from
//! the error path before messages are collected.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::common::{Error, Result};

/// Most distinct messages reported before truncating
pub const MAX_REPORTED_ERRORS: usize = 5;

/// Appended when more than [`MAX_REPORTED_ERRORS`] distinct messages exist
pub const MORE_ERRORS_MARKER: &str = "... more errors found";

/// Outcome of validating one response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Sorted, unique messages; at most `MAX_REPORTED_ERRORS + 1` entries
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate `data` against a draft-7 `schema`
///
/// Fails only when the schema itself does not compile.
pub fn validate(data: &serde_json::Value, schema: &serde_json::Value) -> Result<ValidationReport> {
    let validator = jsonschema::draft7::options()
        .should_validate_formats(true)
        .build(schema)
        .map_err(|e| Error::Schema(e.to_string()))?;

    let unique: BTreeSet<String> = validator
        .iter_errors(data)
        .map(|error| {
            let path = canonical_path(&error.instance_path.to_string());
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{path}: {error}")
            }
        })
        .collect();

    Ok(ValidationReport {
        errors: cap_errors(unique),
    })
}

/// Turn a JSON pointer into a dotted path without array indices
///
/// `/stock_holdings/2/symbol` becomes `stock_holdings.symbol`.
pub fn canonical_path(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !segment.bytes().all(|b| b.is_ascii_digit()))
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn cap_errors(unique: BTreeSet<String>) -> Vec<String> {
    let total = unique.len();
    let mut errors: Vec<String> = unique.into_iter().take(MAX_REPORTED_ERRORS).collect();
    if total > MAX_REPORTED_ERRORS {
        errors.push(MORE_ERRORS_MARKER.to_string());
    }
    errors
}
