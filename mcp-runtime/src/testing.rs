use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::AdapterError;
use crate::transport::{RequestSpec, Transport};

/// Test transport: records every request and answers per endpoint name.
/// Endpoints without a canned reply fail like an unknown id would.
pub struct RecordingTransport {
    replies: HashMap<&'static str, Result<Value, AdapterError>>,
    calls: Mutex<Vec<RequestSpec>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, endpoint: &'static str, payload: Value) -> Self {
        self.replies.insert(endpoint, Ok(payload));
        self
    }

    pub fn fail(mut self, endpoint: &'static str, error: AdapterError) -> Self {
        self.replies.insert(endpoint, Err(error));
        self
    }

    pub fn calls(&self) -> Vec<RequestSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn endpoints_called(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|spec| spec.endpoint.name())
            .collect()
    }
}

impl Transport for RecordingTransport {
    async fn send(&self, spec: RequestSpec) -> Result<Value, AdapterError> {
        let name = spec.endpoint.name();
        self.calls.lock().unwrap().push(spec);
        self.replies.get(name).cloned().unwrap_or_else(|| {
            Err(AdapterError::RemoteApi {
                code: 1,
                message: format!("no canned reply for {name}"),
            })
        })
    }
}
