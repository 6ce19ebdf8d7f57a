//! Scripted in-memory transport for runner tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::http::{ApiResponse, ApiTransport, Method};

/// One request as the fake saw it
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub api_key: Option<String>,
}

#[derive(Default)]
struct Shared {
    responses: HashMap<(Method, String), Vec<ApiResponse>>,
    calls: Vec<RecordedCall>,
}

/// Replays scripted responses per `(method, path)`; unscripted calls get 404
#[derive(Clone, Default)]
pub struct FakeTransport {
    shared: Arc<Mutex<Shared>>,
    api_key: Option<String>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response; queued responses for the same route replay in order
    /// and the last one repeats
    pub fn respond(&self, method: Method, path: &str, response: ApiResponse) {
        let mut shared = self.shared.lock().unwrap();
        shared
            .responses
            .entry((method, path.to_string()))
            .or_default()
            .push(response);
    }

    /// Queue a JSON body with the usual success status for the method
    pub fn respond_json(&self, method: Method, path: &str, body: serde_json::Value) {
        let status = if method == Method::Post { 201 } else { 200 };
        self.respond(method, path, ApiResponse::with_body(status, body));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }
}

#[async_trait]
impl ApiTransport for FakeTransport {
    async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&serde_json::Value>,
        expected: &[u16],
    ) -> ApiResponse {
        let mut shared = self.shared.lock().unwrap();
        shared.calls.push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
            api_key: self.api_key.clone(),
        });

        let response = match shared.responses.get_mut(&(method, path.to_string())) {
            Some(queue) if queue.len() > 1 => queue.remove(0),
            Some(queue) => queue
                .first()
                .cloned()
                .unwrap_or_else(|| ApiResponse::status_only(404)),
            None => ApiResponse::status_only(404),
        };

        // Mirror the real client: bodies only for expected 2xx statuses
        if expected.contains(&response.status) && response.is_success() {
            response
        } else {
            ApiResponse::status_only(response.status)
        }
    }

    fn with_api_key(&self, api_key: &str) -> Box<dyn ApiTransport> {
        Box::new(Self {
            shared: Arc::clone(&self.shared),
            api_key: Some(api_key.to_string()),
        })
    }
}
