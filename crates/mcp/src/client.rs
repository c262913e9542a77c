//! Client side: talk to a tool server over a pair of byte streams.
//!
//! Normally the streams are the stdin/stdout of a child process started with
//! [`StdioToolClient::spawn`]. One request is in flight at a time; the session
//! mutex is held from queueing the request until its response is read.
//!
//! Frames are written by a dedicated writer task. A caller that is cancelled
//! (for example by a timeout) only ever abandons a whole queued frame, never
//! half of one, so the next request still lines up with the server.

use crate::protocol::{
    CallToolParams, Implementation, InitializeResult, ListToolsResult, PROTOCOL_VERSION,
    RpcError, RpcRequest, RpcResponse, codes, methods,
};
use async_trait::async_trait;
use deepcontext_core::error::ToolError;
use deepcontext_core::tool::{CallToolResult, ToolDescriptor, ToolServer};
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines,
};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Frames queued for the writer task before senders wait.
const FRAME_QUEUE: usize = 16;

struct Session {
    reader: Lines<BufReader<BoxedReader>>,
    frames: Option<mpsc::Sender<String>>,
    writer_task: Option<JoinHandle<()>>,
    child: Option<Child>,
    next_id: u64,
}

/// Write queued frames one at a time until the queue closes or a write fails.
fn spawn_writer(mut writer: BoxedWriter) -> (mpsc::Sender<String>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<String>(FRAME_QUEUE);
    let handle = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let written = async {
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await
            }
            .await;
            if let Err(e) = written {
                warn!(error = %e, "Tool server input closed");
                return;
            }
        }
        let _ = writer.shutdown().await;
    });
    (tx, handle)
}

/// A [`ToolServer`] reached over line-delimited JSON-RPC.
pub struct StdioToolClient {
    session: Mutex<Session>,
    server_info: Implementation,
}

impl StdioToolClient {
    /// Start `command args...` and perform the `initialize` handshake.
    pub async fn spawn(command: &str, args: &[String]) -> Result<Self, ToolError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::Transport(format!("failed to start tool server '{command}': {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ToolError::Transport("tool server stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ToolError::Transport("tool server stdout unavailable".into()))?;

        info!(command, ?args, pid = child.id(), "Tool server process started");
        Self::handshake(Box::new(stdout), Box::new(stdin), Some(child)).await
    }

    /// Connect over already-open streams and perform the `initialize` handshake.
    pub async fn connect<R, W>(reader: R, writer: W) -> Result<Self, ToolError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::handshake(Box::new(reader), Box::new(writer), None).await
    }

    async fn handshake(
        reader: BoxedReader,
        writer: BoxedWriter,
        child: Option<Child>,
    ) -> Result<Self, ToolError> {
        let (frames, writer_task) = spawn_writer(writer);
        let mut session = Session {
            reader: BufReader::new(reader).lines(),
            frames: Some(frames),
            writer_task: Some(writer_task),
            child,
            next_id: 1,
        };

        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "deepcontext-agent",
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let result = session
            .request(methods::INITIALIZE, params)
            .await?
            .map_err(|e| ToolError::Transport(format!("initialize rejected: {e}")))?;

        let init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| ToolError::Transport(format!("malformed initialize response: {e}")))?;

        session
            .notify(methods::INITIALIZED, Value::Null)
            .await?;

        info!(
            server = %init.server_info.name,
            version = %init.server_info.version,
            protocol = %init.protocol_version,
            "Connected to tool server"
        );

        Ok(Self {
            session: Mutex::new(session),
            server_info: init.server_info,
        })
    }

    /// Name and version the server reported.
    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    /// Send `ping` and wait for the answer.
    pub async fn ping(&self) -> Result<(), ToolError> {
        let mut session = self.session.lock().await;
        session
            .request(methods::PING, Value::Null)
            .await?
            .map(|_| ())
            .map_err(|e| ToolError::Transport(e.to_string()))
    }

    /// Close the server's input and wait briefly for the process to exit.
    pub async fn shutdown(&self) {
        let mut session = self.session.lock().await;
        session.frames.take();
        if let Some(task) = session.writer_task.take() {
            if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
                warn!("Tool server input did not drain in time");
            }
        }
        if let Some(mut child) = session.child.take() {
            match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "Tool server exited"),
                Ok(Err(e)) => warn!(error = %e, "Failed to wait for tool server"),
                Err(_) => {
                    warn!("Tool server did not exit in time, killing it");
                    let _ = child.kill().await;
                }
            }
        }
    }
}

impl Session {
    /// Queue one frame for the writer task.
    async fn send(&mut self, request: &RpcRequest) -> Result<(), ToolError> {
        let frames = self
            .frames
            .as_ref()
            .ok_or_else(|| ToolError::Transport("tool server session is closed".into()))?;

        let mut line = serde_json::to_string(request)
            .map_err(|e| ToolError::Transport(format!("failed to encode request: {e}")))?;
        trace!(frame = %line, ">>> request");
        line.push('\n');

        frames
            .send(line)
            .await
            .map_err(|_| ToolError::Transport("tool server input is closed".into()))
    }

    async fn notify(&mut self, method: &str, params: Value) -> Result<(), ToolError> {
        self.send(&RpcRequest::notification(method, params)).await
    }

    /// Send one request and read lines until its response arrives.
    ///
    /// The outer error is a transport failure; the inner one is the server's
    /// JSON-RPC error.
    async fn request(
        &mut self,
        method: &str,
        params: Value,
    ) -> Result<Result<Value, RpcError>, ToolError> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&RpcRequest::new(id, method, params)).await?;

        loop {
            let line = self
                .reader
                .next_line()
                .await
                .map_err(|e| ToolError::Transport(format!("read failed: {e}")))?
                .ok_or_else(|| ToolError::Transport("tool server closed the connection".into()))?;

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            trace!(frame = %line, "<<< response");

            let response: RpcResponse = match serde_json::from_str(line) {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(error = %e, "Ignoring unparsable line from tool server");
                    continue;
                }
            };

            // A response left over from an abandoned (timed out) request.
            if response.id.as_u64() != Some(id) {
                debug!(expected = id, got = %response.id, "Skipping unmatched response");
                continue;
            }

            return Ok(response.into_result());
        }
    }
}

/// Map a JSON-RPC error from `tools/call` onto the tool error taxonomy.
fn call_failure(tool_name: &str, error: RpcError) -> ToolError {
    match error.code {
        codes::INVALID_PARAMS => ToolError::InvalidArguments(error.message),
        _ => ToolError::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: error.to_string(),
        },
    }
}

#[async_trait]
impl ToolServer for StdioToolClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let mut session = self.session.lock().await;
        let result = session
            .request(methods::TOOLS_LIST, Value::Null)
            .await?
            .map_err(|e| ToolError::Transport(format!("tools/list failed: {e}")))?;

        let list: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| ToolError::Transport(format!("malformed tools/list response: {e}")))?;
        debug!(tools = list.tools.len(), "Fetched tool catalog");
        Ok(list.tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, ToolError> {
        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let mut session = self.session.lock().await;
        let result = session
            .request(methods::TOOLS_CALL, params)
            .await?
            .map_err(|e| call_failure(name, e))?;

        serde_json::from_value(result)
            .map_err(|e| ToolError::Transport(format!("malformed tools/call response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::serve;
    use async_trait::async_trait;
    use deepcontext_core::tool::{Tool, ToolRegistry, ToolResult};
    use std::sync::Arc;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }
        fn description(&self) -> &str {
            "Uppercases text"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }
        async fn execute(&self, arguments: Value) -> Result<ToolResult, ToolError> {
            match arguments["text"].as_str() {
                Some(text) => Ok(ToolResult::ok(text.to_uppercase())),
                None => Ok(ToolResult::failed("no text given")),
            }
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "Takes its time"
        }
        fn parameters_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }
        async fn execute(&self, _arguments: Value) -> Result<ToolResult, ToolError> {
            tokio::time::sleep(Duration::from_millis(600)).await;
            Ok(ToolResult::ok("done"))
        }
    }

    /// A client wired to an in-process server through a duplex pipe.
    async fn connected_client() -> StdioToolClient {
        client_over_pipe(64 * 1024).await
    }

    async fn client_over_pipe(pipe_size: usize) -> StdioToolClient {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UpperTool));
        registry.register(Box::new(SlowTool));
        let registry = Arc::new(registry);

        let (client_side, server_side) = tokio::io::duplex(pipe_size);
        tokio::spawn(async move {
            let (read, write) = tokio::io::split(server_side);
            let _ = serve(&registry, BufReader::new(read), write).await;
        });

        let (read, write) = tokio::io::split(client_side);
        StdioToolClient::connect(read, write).await.unwrap()
    }

    #[tokio::test]
    async fn handshake_reports_server() {
        let client = connected_client().await;
        assert_eq!(client.server_info().name, "deepcontext");
        client.ping().await.unwrap();
    }

    #[tokio::test]
    async fn list_and_call_round_trip() {
        let client = connected_client().await;

        let tools = client.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "upper");

        let result = client
            .call_tool("upper", serde_json::json!({"text": "graph"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.first_text(), "GRAPH");

        let failed = client.call_tool("upper", serde_json::json!({})).await.unwrap();
        assert!(failed.is_error);
        assert_eq!(failed.first_text(), "no text given");
    }

    #[tokio::test]
    async fn invalid_params_map_to_invalid_arguments() {
        let client = connected_client().await;
        let err = client
            .call_tool("upper", serde_json::json!("not an object"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn closed_server_is_a_transport_error() {
        let (client_side, server_side) = tokio::io::duplex(1024);
        drop(server_side);
        let (read, write) = tokio::io::split(client_side);
        let err = StdioToolClient::connect(read, write).await.err().unwrap();
        assert!(matches!(err, ToolError::Transport(_)));
    }

    #[tokio::test]
    async fn shutdown_closes_session() {
        let client = connected_client().await;
        client.shutdown().await;
        let err = client.list_tools().await.unwrap_err();
        assert!(matches!(err, ToolError::Transport(_)));
    }

    #[tokio::test]
    async fn abandoned_calls_leave_the_session_usable() {
        // A pipe far smaller than one request frame.
        let client = client_over_pipe(512).await;
        let short = Duration::from_millis(100);

        let slow = tokio::time::timeout(short, client.call_tool("slow", serde_json::json!({}))).await;
        assert!(slow.is_err());

        // Queued while the server is still busy, so it cannot be written in one go.
        let big = serde_json::json!({"text": "x".repeat(4000)});
        let stuck = tokio::time::timeout(short, client.call_tool("upper", big)).await;
        assert!(stuck.is_err());

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client.call_tool("upper", serde_json::json!({"text": "ok"})),
        )
        .await
        .expect("session stayed usable")
        .unwrap();
        assert_eq!(result.first_text(), "OK");
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn spawn_missing_binary_fails() {
        let err = StdioToolClient::spawn("/definitely/not/a/real/binary", &[])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ToolError::Transport(m) if m.contains("failed to start")));
    }
}
