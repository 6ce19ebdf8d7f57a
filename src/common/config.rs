//! Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Where the graded service lives and how to authenticate
    #[serde(default)]
    pub target: TargetConfig,

    /// Expected values for the exact-value checks
    #[serde(default)]
    pub expectations: Expectations,
}

/// Connection settings for the service under test
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    /// Base URL every endpoint path is appended to
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Header carrying the API key
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Environment variable the API key is read from
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_header: default_api_key_header(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:4000".to_string()
}
fn default_api_key_header() -> String {
    "DATA-241-API-KEY".to_string()
}
fn default_api_key_env() -> String {
    "DATA_241_API_KEY".to_string()
}
fn default_request_timeout() -> u64 {
    30
}

/// Expected results of the value checks
///
/// Returns come out of floating-point aggregation over many rows, so they are
/// compared with an absolute tolerance and never with exact equality.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Expectations {
    /// Absolute tolerance for return comparisons (inclusive)
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Expected return of the first v3 account
    #[serde(default = "default_first_account_return")]
    pub first_account_return: f64,

    /// Expected return of the second v3 account
    #[serde(default = "default_second_account_return")]
    pub second_account_return: f64,

    /// Expected number of backtest observations (exact)
    #[serde(default = "default_backtest_observations")]
    pub backtest_observations: u64,

    /// Accepted backtest returns; matching any one of them passes
    #[serde(default = "default_backtest_returns")]
    pub backtest_returns: Vec<f64>,
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            first_account_return: default_first_account_return(),
            second_account_return: default_second_account_return(),
            backtest_observations: default_backtest_observations(),
            backtest_returns: default_backtest_returns(),
        }
    }
}

fn default_tolerance() -> f64 {
    0.05
}
fn default_first_account_return() -> f64 {
    1568.0
}
fn default_second_account_return() -> f64 {
    -47.62
}
fn default_backtest_observations() -> u64 {
    2033
}
fn default_backtest_returns() -> Vec<f64> {
    vec![2188.4675, 2059.37]
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// used when present, otherwise the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Reject values the runner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.target.base_url.trim().is_empty() {
            return Err(Error::Config("target.base_url must not be empty".to_string()));
        }
        let tolerance = self.expectations.tolerance;
        if tolerance.is_nan() || tolerance < 0.0 {
            return Err(Error::Config(format!(
                "expectations.tolerance must be a non-negative number, got {tolerance}"
            )));
        }
        if self.expectations.backtest_returns.is_empty() {
            return Err(Error::Config(
                "expectations.backtest_returns needs at least one accepted value".to_string(),
            ));
        }
        Ok(())
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.target.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::missing_credential(&self.target.api_key_env)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.target.base_url, "http://localhost:4000");
        assert_eq!(config.target.api_key_header, "DATA-241-API-KEY");
        assert_eq!(config.expectations.tolerance, 0.05);
        assert_eq!(config.expectations.backtest_returns, vec![2188.4675, 2059.37]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[target]
base_url = "http://127.0.0.1:5000"

[expectations]
backtest_returns = [3051.61]
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.target.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.target.api_key_env, "DATA_241_API_KEY");
        assert_eq!(config.expectations.backtest_returns, vec![3051.61]);
        assert_eq!(config.expectations.backtest_observations, 2033);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/api-grader.toml"))).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[target\nbase_url = ").unwrap();
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn test_empty_backtest_returns_rejected() {
        let mut config = Config::default();
        config.expectations.backtest_returns.clear();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_api_key_missing_is_credential_error() {
        let mut config = Config::default();
        config.target.api_key_env = "API_GRADER_TEST_UNSET_KEY_VAR".to_string();
        let err = config.api_key().unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
    }
}
