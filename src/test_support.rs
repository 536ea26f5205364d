//! In-memory transport for capability tests.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Mutex;

use crate::auth::{ApiTransport, ClientError, QueryParams, Result};

pub const TEST_BASE_URL: &str = "https://managed.test.com/e/abc123";

/// Records every GET and answers with a canned body (or a canned status error).
pub struct RecordingTransport {
    response: Value,
    status_error: Option<(u16, String)>,
    calls: Mutex<Vec<(String, QueryParams)>>,
}

impl RecordingTransport {
    pub fn returning(response: Value) -> Self {
        Self {
            response,
            status_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        Self {
            response: Value::Null,
            status_error: Some((status, body.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, QueryParams)> {
        self.calls.lock().unwrap().clone()
    }

    /// The single recorded call; panics if there were zero or several.
    pub fn only_call(&self) -> (String, QueryParams) {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one call, got {:?}", calls);
        calls.into_iter().next().unwrap()
    }
}

#[async_trait]
impl ApiTransport for RecordingTransport {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), params.clone()));

        match &self.status_error {
            Some((status, body)) => Err(ClientError::HttpStatus {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(self.response.clone()),
        }
    }

    fn base_url(&self) -> &str {
        TEST_BASE_URL
    }
}

/// Build `QueryParams` from literal pairs.
pub fn params(pairs: &[(&str, &str)]) -> QueryParams {
    pairs.iter().copied().collect()
}
