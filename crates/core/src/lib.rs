//! # DeepContext Core
//!
//! Domain types, traits, and error definitions for the DeepContext agent.
//! This crate defines the domain model that all other crates implement
//! against: the transcript, the oracle (`Provider`), and the tool server
//! (`ToolServer`).
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in
//! their respective crates, so the agent loop can be driven by scripted
//! mocks in tests and by real HTTP / stdio backends in the binary.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{ActionRequest, Message, Role, Transcript, TranscriptId};
pub use provider::{CatalogEntry, Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{CallToolResult, ContentBlock, Tool, ToolDescriptor, ToolRegistry, ToolResult, ToolServer};
pub use agent::AgentConfig;
pub use event::{DomainEvent, EventBus};
