//! Tool dispatcher: turns one action request into one tool turn.
//!
//! Nothing that goes wrong here is fatal to the run. Bad arguments, unknown
//! tools, failing tools and timeouts all become tool turns with readable
//! error text, so the model can see what happened and try again.

use chrono::Utc;
use deepcontext_core::error::ToolError;
use deepcontext_core::event::{DomainEvent, EventBus};
use deepcontext_core::message::{ActionRequest, Message};
use deepcontext_core::tool::ToolServer;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PREVIEW_CHARS: usize = 120;

/// Dispatches action requests for one run.
///
/// Remembers the correlation ids it has answered; a repeated id is answered
/// with an error and not sent to the tool server again.
pub struct ToolDispatcher {
    server: Arc<dyn ToolServer>,
    timeout: Option<Duration>,
    event_bus: Arc<EventBus>,
    answered: HashSet<String>,
}

impl ToolDispatcher {
    pub fn new(server: Arc<dyn ToolServer>, event_bus: Arc<EventBus>) -> Self {
        Self {
            server,
            timeout: None,
            event_bus,
            answered: HashSet::new(),
        }
    }

    /// Give up on a tool call after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Answer `request` with a tool turn. Never fails.
    pub async fn invoke(&mut self, request: &ActionRequest) -> Message {
        let start = Instant::now();

        let (content, success) = if !self.answered.insert(request.id.clone()) {
            warn!(call_id = %request.id, tool = %request.name, "Duplicate action id, not dispatching");
            (
                format!(
                    "Error: duplicate tool call id '{}'; this call was not executed.",
                    request.id
                ),
                false,
            )
        } else {
            match decode_arguments(&request.arguments) {
                Ok(arguments) => self.call(&request.name, arguments).await,
                Err(reason) => {
                    debug!(tool = %request.name, %reason, "Undecodable action arguments");
                    (
                        format!(
                            "Error: invalid arguments for tool '{}': {reason}",
                            request.name
                        ),
                        false,
                    )
                }
            }
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            call_id: request.id.clone(),
            tool_name: request.name.clone(),
            success,
            duration_ms: start.elapsed().as_millis() as u64,
            output_preview: preview(&content),
            timestamp: Utc::now(),
        });

        Message::tool_result(request, content)
    }

    /// One call to the tool server, normalized to `(text, success)`.
    async fn call(&self, name: &str, arguments: Value) -> (String, bool) {
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.server.call_tool(name, arguments))
                .await
                .unwrap_or_else(|_| {
                    Err(ToolError::Timeout {
                        tool_name: name.to_string(),
                        timeout_secs: limit.as_secs(),
                    })
                }),
            None => self.server.call_tool(name, arguments).await,
        };

        match outcome {
            Ok(result) => {
                if result.content.len() > 1 {
                    debug!(tool = name, blocks = result.content.len(), "Keeping first content block only");
                }
                (result.first_text().to_string(), !result.is_error)
            }
            Err(e) => {
                warn!(tool = name, error = %e, "Tool call failed");
                (format!("Error: {e}"), false)
            }
        }
    }
}

/// Decode raw argument text into a JSON object.
///
/// Blank text means "no arguments" and decodes to `{}`.
pub fn decode_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(text: &str) -> String {
    let mut s: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        s.push_str("...");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::RecordingToolServer;
    use deepcontext_core::message::Role;
    use deepcontext_core::tool::{CallToolResult, ContentBlock};
    use serde_json::json;

    fn dispatcher(server: Arc<RecordingToolServer>) -> ToolDispatcher {
        ToolDispatcher::new(server, Arc::new(EventBus::default()))
    }

    #[test]
    fn decode_blank_is_empty_object() {
        assert_eq!(decode_arguments("").unwrap(), json!({}));
        assert_eq!(decode_arguments("  \n").unwrap(), json!({}));
    }

    #[test]
    fn decode_rejects_non_objects() {
        assert!(decode_arguments("[1, 2]").unwrap_err().contains("an array"));
        assert!(decode_arguments("\"path\"").unwrap_err().contains("a string"));
        assert!(decode_arguments("{not json").is_err());
    }

    #[tokio::test]
    async fn well_formed_call_reaches_server_once() {
        let server = Arc::new(RecordingToolServer::new().with_result(
            "list_notes",
            Ok(CallToolResult::text("1. a.md", false)),
        ));
        let mut d = dispatcher(server.clone());

        let req = ActionRequest::new("call_1", "list_notes", r#"{"path":"."}"#);
        let turn = d.invoke(&req).await;

        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(turn.name.as_deref(), Some("list_notes"));
        assert_eq!(turn.content, "1. a.md");
        assert_eq!(server.calls(), vec![("list_notes".to_string(), json!({"path": "."}))]);
    }

    #[tokio::test]
    async fn unparsable_arguments_skip_the_server() {
        let server = Arc::new(RecordingToolServer::new());
        let mut d = dispatcher(server.clone());

        let turn = d
            .invoke(&ActionRequest::new("call_1", "read_note", "{\"path\": "))
            .await;

        assert_eq!(turn.role, Role::Tool);
        assert_eq!(turn.tool_call_id.as_deref(), Some("call_1"));
        assert!(turn.content.starts_with("Error: invalid arguments for tool 'read_note'"));
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_arguments_call_with_empty_object() {
        let server = Arc::new(RecordingToolServer::new());
        let mut d = dispatcher(server.clone());
        d.invoke(&ActionRequest::new("c", "list_notes", "")).await;
        assert_eq!(server.calls()[0].1, json!({}));
    }

    #[tokio::test]
    async fn only_first_block_is_kept() {
        let result = CallToolResult {
            content: vec![ContentBlock::text("first"), ContentBlock::text("second")],
            is_error: false,
        };
        let server = Arc::new(RecordingToolServer::new().with_result("t", Ok(result)));
        let turn = dispatcher(server).invoke(&ActionRequest::new("c", "t", "{}")).await;
        assert_eq!(turn.content, "first");
    }

    #[tokio::test]
    async fn zero_blocks_yield_empty_text() {
        let result = CallToolResult {
            content: vec![],
            is_error: false,
        };
        let server = Arc::new(RecordingToolServer::new().with_result("t", Ok(result)));
        let turn = dispatcher(server).invoke(&ActionRequest::new("c", "t", "{}")).await;
        assert_eq!(turn.content, "");
    }

    #[tokio::test]
    async fn error_results_keep_their_text() {
        let server = Arc::new(
            RecordingToolServer::new()
                .with_result("t", Ok(CallToolResult::text("SQL error: no such column", true))),
        );
        let turn = dispatcher(server).invoke(&ActionRequest::new("c", "t", "{}")).await;
        assert_eq!(turn.content, "SQL error: no such column");
    }

    #[tokio::test]
    async fn tool_errors_become_error_text() {
        let server = Arc::new(
            RecordingToolServer::new()
                .with_result("t", Err(ToolError::Transport("broken pipe".into()))),
        );
        let turn = dispatcher(server).invoke(&ActionRequest::new("c", "t", "{}")).await;
        assert!(turn.content.starts_with("Error: "));
        assert!(turn.content.contains("broken pipe"));
    }

    #[tokio::test]
    async fn unknown_tool_is_recoverable() {
        let server = Arc::new(RecordingToolServer::new());
        let turn = dispatcher(server)
            .invoke(&ActionRequest::new("c", "missing_tool", "{}"))
            .await;
        assert!(turn.content.contains("missing_tool"));
        assert!(turn.content.starts_with("Error: "));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let server = Arc::new(RecordingToolServer::new().with_delay(Duration::from_secs(30)));
        let mut d = dispatcher(server).with_timeout(Some(Duration::from_secs(2)));
        let turn = d.invoke(&ActionRequest::new("c", "t", "{}")).await;
        assert!(turn.content.contains("timed out"));
        assert_eq!(turn.tool_call_id.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn duplicate_id_is_answered_but_not_dispatched() {
        let server = Arc::new(RecordingToolServer::new());
        let mut d = dispatcher(server.clone());

        let req = ActionRequest::new("dup", "list_notes", "{}");
        d.invoke(&req).await;
        let second = d.invoke(&req).await;

        assert_eq!(server.calls().len(), 1);
        assert!(second.content.contains("duplicate tool call id"));
        assert_eq!(second.tool_call_id.as_deref(), Some("dup"));
    }

    #[tokio::test]
    async fn publishes_tool_executed() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let mut d = ToolDispatcher::new(Arc::new(RecordingToolServer::new()), bus);

        d.invoke(&ActionRequest::new("c9", "list_notes", "[]")).await;

        match rx.recv().await.unwrap().as_ref() {
            DomainEvent::ToolExecuted { call_id, success, .. } => {
                assert_eq!(call_id, "c9");
                assert!(!success);
            }
            other => panic!("Expected ToolExecuted, got {other:?}"),
        }
    }
}
