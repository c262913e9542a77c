//! # DeepContext tool protocol
//!
//! Line-delimited JSON-RPC 2.0 between the agent and its tool server,
//! following the MCP `initialize` / `tools/list` / `tools/call` methods.
//!
//! - [`server::serve`] answers requests from a `ToolRegistry` (the `serve`
//!   subcommand runs it over stdin/stdout).
//! - [`client::StdioToolClient`] spawns that server as a child process and
//!   implements `ToolServer` for the agent loop.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::StdioToolClient;
pub use protocol::{RpcError, RpcRequest, RpcResponse};
pub use server::serve;
