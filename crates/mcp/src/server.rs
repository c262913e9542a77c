//! Tool server side: answer JSON-RPC lines from a [`ToolRegistry`].
//!
//! Stdout carries protocol frames only; all logging goes through `tracing`,
//! which the binary points at stderr in serve mode.

use crate::protocol::{
    CallToolParams, Implementation, InitializeResult, ListToolsResult, PROTOCOL_VERSION,
    RpcError, RpcRequest, RpcResponse, JSONRPC_VERSION, methods,
};
use deepcontext_core::tool::{CallToolResult, ToolRegistry};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn};

pub const SERVER_NAME: &str = "deepcontext";

/// Serve `registry` until `reader` reaches EOF.
///
/// Every request line gets exactly one response line, in order.
pub async fn serve<R, W>(registry: &ToolRegistry, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(tools = registry.len(), "Tool server ready");
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        trace!(frame = %line, "<<< request");

        if let Some(response) = handle_line(registry, line).await {
            let mut json = serde_json::to_string(&response)?;
            trace!(frame = %json, ">>> response");
            json.push('\n');
            writer.write_all(json.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    info!("Input closed, tool server stopping");
    Ok(())
}

/// Handle one line. `None` for notifications.
pub async fn handle_line(registry: &ToolRegistry, line: &str) -> Option<RpcResponse> {
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(RpcResponse::error(Value::Null, RpcError::parse_error(e.to_string()))),
    };

    let raw_id = value.get("id").cloned().unwrap_or(Value::Null);

    let request: RpcRequest = match serde_json::from_value(value) {
        Ok(req) => req,
        Err(e) => {
            return Some(RpcResponse::error(raw_id, RpcError::invalid_request(e.to_string())));
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Some(RpcResponse::error(
            raw_id,
            RpcError::invalid_request(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
        ));
    }

    let Some(id) = request.id.clone() else {
        debug!(method = %request.method, "Notification received");
        return None;
    };

    Some(match dispatch_method(registry, &request).await {
        Ok(result) => RpcResponse::success(id, result),
        Err(error) => {
            debug!(method = %request.method, code = error.code, "Request failed");
            RpcResponse::error(id, error)
        }
    })
}

async fn dispatch_method(registry: &ToolRegistry, request: &RpcRequest) -> Result<Value, RpcError> {
    match request.method.as_str() {
        methods::INITIALIZE => to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            capabilities: serde_json::json!({ "tools": {} }),
        }),
        methods::PING => Ok(serde_json::json!({})),
        methods::TOOLS_LIST => to_value(ListToolsResult {
            tools: registry.descriptors(),
        }),
        methods::TOOLS_CALL => {
            let params: CallToolParams = serde_json::from_value(request.params.clone())
                .map_err(|e| RpcError::invalid_params(format!("Invalid params: {e}")))?;

            let arguments = match params.arguments {
                Value::Null => serde_json::json!({}),
                Value::Object(map) => Value::Object(map),
                other => {
                    return Err(RpcError::invalid_params(format!(
                        "arguments must be an object, got {other}"
                    )));
                }
            };

            to_value(call_tool(registry, &params.name, arguments).await)
        }
        other => Err(RpcError::method_not_found(other)),
    }
}

/// Tool failures are results the model should read, not protocol errors.
async fn call_tool(registry: &ToolRegistry, name: &str, arguments: Value) -> CallToolResult {
    match registry.execute(name, arguments).await {
        Ok(result) => {
            debug!(tool = name, success = result.success, "Tool executed");
            CallToolResult::text(result.output, !result.success)
        }
        Err(e) => {
            warn!(tool = name, error = %e, "Tool call failed");
            CallToolResult::text(e.to_string(), true)
        }
    }
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(e.to_string()))
}
