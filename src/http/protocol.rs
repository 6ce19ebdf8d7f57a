//! Request/response types shared by the client adapter and the runner

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::common::{Error, Result};

/// HTTP methods the graded API uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Anything but GET, POST or DELETE is a configuration error
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(Error::UnsupportedMethod(s.to_string())),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Status code used when a request fails before any response arrives
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

/// Outcome of a single request
///
/// `body` is `None` when the status was not expected, the request never got a
/// response, or the response could not be decoded as JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub body: Option<serde_json::Value>,
    pub status: u16,
}

impl ApiResponse {
    /// Response with a decoded body
    pub fn with_body(status: u16, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            status,
        }
    }

    /// Response without a usable body
    pub fn status_only(status: u16) -> Self {
        Self { body: None, status }
    }

    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported_methods() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);
    }

    #[test]
    fn test_unsupported_method_is_config_error() {
        let err = "PUT".parse::<Method>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedMethod(ref m) if m == "PUT"));
        assert!(err.is_fatal_config());
    }

    #[test]
    fn test_success_range() {
        assert!(ApiResponse::status_only(204).is_success());
        assert!(!ApiResponse::status_only(404).is_success());
        assert!(!ApiResponse::status_only(199).is_success());
    }
}
