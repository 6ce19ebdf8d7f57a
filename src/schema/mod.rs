//! Response schemas and the validator that checks bodies against them

pub mod catalog;
pub mod validator;

pub use catalog::{PriceField, ResponseSchema};
pub use validator::{validate, ValidationReport, MAX_REPORTED_ERRORS, MORE_ERRORS_MARKER};
