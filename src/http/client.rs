//! HTTP client adapter for the service under test
//!
//! Single-shot request/response: no retries and no backoff. Failures never
//! escape as errors; they come back as an `ApiResponse` without a body.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::common::config::TargetConfig;
use crate::common::{Error, Result};

use super::protocol::{ApiResponse, Method, TRANSPORT_FAILURE_STATUS};

/// Longest slice of an undecodable body echoed in the warning
const BODY_PREVIEW_CHARS: usize = 200;

/// Something that can issue requests against the graded API
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Issue one request
    ///
    /// The body is decoded only when `status` is in `expected` and is a 2xx.
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&serde_json::Value>,
        expected: &[u16],
    ) -> ApiResponse;

    /// Same transport, authenticating with a different API key
    fn with_api_key(&self, api_key: &str) -> Box<dyn ApiTransport>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    api_key_header: HeaderName,
    api_key: Option<HeaderValue>,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        api_key_header: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key_header = HeaderName::from_bytes(api_key_header.as_bytes()).map_err(|e| {
            Error::Config(format!("Invalid API key header name '{api_key_header}': {e}"))
        })?;
        let api_key = api_key
            .map(HeaderValue::from_str)
            .transpose()
            .map_err(|e| Error::Config(format!("API key is not a valid header value: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key_header,
            api_key,
            client,
        })
    }

    /// Create a client from the `[target]` configuration section
    pub fn from_config(target: &TargetConfig, api_key: Option<&str>) -> Result<Self> {
        Self::new(
            &target.base_url,
            &target.api_key_header,
            api_key,
            Duration::from_secs(target.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.api_key {
            headers.insert(self.api_key_header.clone(), key.clone());
        }
        headers
    }
}

#[async_trait]
impl ApiTransport for ApiClient {
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&serde_json::Value>,
        expected: &[u16],
    ) -> ApiResponse {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, path, body = ?body, "API request");

        let mut req = self
            .client
            .request(method.into(), &url)
            .headers(self.headers());
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                let status = e
                    .status()
                    .map_or(TRANSPORT_FAILURE_STATUS, |s| s.as_u16());
                warn!(method = %method, path, error = %e, status, "Request failed");
                return ApiResponse::status_only(status);
            }
        };

        let status = response.status().as_u16();
        info!(method = %method, path, status, "Response status code: {}", status);

        if !expected.contains(&status) || !response.status().is_success() {
            return ApiResponse::status_only(status);
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!(method = %method, path, error = %e, "Failed to read response body");
                return ApiResponse::status_only(status);
            }
        };

        if text.trim().is_empty() {
            return ApiResponse::status_only(status);
        }

        match serde_json::from_str(&text) {
            Ok(json) => ApiResponse::with_body(status, json),
            Err(e) => {
                let preview: String = text.chars().take(BODY_PREVIEW_CHARS).collect();
                warn!(
                    method = %method,
                    path,
                    error = %e,
                    "Response is not JSON decodable: {}",
                    preview
                );
                ApiResponse::status_only(status)
            }
        }
    }

    fn with_api_key(&self, api_key: &str) -> Box<dyn ApiTransport> {
        let api_key = match HeaderValue::from_str(api_key) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "API key is not a valid header value, sending none");
                None
            }
        };
        Box::new(Self {
            api_key,
            ..self.clone()
        })
    }
}
