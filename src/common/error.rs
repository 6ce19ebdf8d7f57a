//! Error types for the API grader
//!
//! Only setup problems surface as errors. Everything that can go wrong while
//! talking to the graded service is recorded as a step outcome instead, so a
//! run always finishes.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the API grader
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Environment variable {var} is not set. Export the API key before running the grader")]
    MissingCredential { var: String },

    #[error("Unsupported HTTP method '{0}'. Supported methods: GET, POST, DELETE")]
    UnsupportedMethod(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === HTTP Errors ===
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    // === Schema Errors ===
    #[error("Schema definition rejected by validator: {0}")]
    Schema(String),

    #[error("Unknown schema '{0}'. Use 'api-grader schemas' to list the catalog")]
    UnknownSchema(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a missing credential error for an environment variable
    pub fn missing_credential(var: &str) -> Self {
        Self::MissingCredential {
            var: var.to_string(),
        }
    }

    /// Whether the error should stop the process before any request is sent
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. }
                | Self::UnsupportedMethod(_)
                | Self::Config(_)
                | Self::ConfigParse(_)
                | Self::FileRead { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_names_variable() {
        let err = Error::missing_credential("DATA_241_API_KEY");
        assert!(err.to_string().contains("DATA_241_API_KEY"));
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_schema_error_is_not_config() {
        let err = Error::Schema("bad".to_string());
        assert!(!err.is_fatal_config());
    }
}
