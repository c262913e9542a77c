//! Shared test helpers: scripted oracles and a recording tool server.

use async_trait::async_trait;
use deepcontext_core::error::{ProviderError, ToolError};
use deepcontext_core::message::{ActionRequest, Message};
use deepcontext_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use deepcontext_core::tool::{CallToolResult, ToolDescriptor, ToolServer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and records
/// the request it was given. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no actions).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();

        if index >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                index,
                responses.len()
            );
        }

        requests.push(request);
        Ok(responses[index].clone())
    }
}

/// An oracle that never stops asking for `list_notes`.
///
/// Each response carries one action with a fresh correlation id.
pub struct AlwaysActingProvider {
    calls: Mutex<usize>,
}

impl AlwaysActingProvider {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Provider for AlwaysActingProvider {
    fn name(&self) -> &str {
        "always_acting"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        Ok(make_action_response(
            vec![make_action(
                &format!("call_{}", *calls),
                "list_notes",
                serde_json::json!({"path": "."}),
            )],
            &format!("still looking ({})", *calls),
        ))
    }
}

/// An oracle whose every call fails.
pub struct FailingProvider {
    error: ProviderError,
}

impl FailingProvider {
    pub fn new(error: ProviderError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.error.clone())
    }
}

/// A tool server that records calls and answers from a fixed table.
///
/// Tools without a configured result answer `ToolError::NotFound`.
pub struct RecordingToolServer {
    descriptors: Vec<ToolDescriptor>,
    results: HashMap<String, Result<CallToolResult, ToolError>>,
    catalog_error: Option<ToolError>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl RecordingToolServer {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
            results: HashMap::new(),
            catalog_error: None,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Advertise a tool and answer its calls with `text`.
    pub fn with_tool(mut self, name: &str, text: &str) -> Self {
        self.descriptors.push(ToolDescriptor {
            name: name.into(),
            description: format!("{name} tool"),
            input_schema: serde_json::json!({"type": "object"}),
        });
        self.results
            .insert(name.into(), Ok(CallToolResult::text(text, false)));
        self
    }

    pub fn with_result(mut self, name: &str, result: Result<CallToolResult, ToolError>) -> Self {
        self.results.insert(name.into(), result);
        self
    }

    pub fn with_catalog_error(mut self, error: ToolError) -> Self {
        self.catalog_error = Some(error);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(tool name, decoded arguments)` per call, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolServer for RecordingToolServer {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        match &self.catalog_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.descriptors.clone()),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, ToolError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.results
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(ToolError::NotFound(name.to_string())))
    }
}

/// Create a simple text response (no actions).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response carrying actions and optional thought content.
pub fn make_action_response(actions: Vec<ActionRequest>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_actions(thought, actions),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_action(id: &str, name: &str, args: Value) -> ActionRequest {
    ActionRequest::new(id, name, serde_json::to_string(&args).unwrap())
}
