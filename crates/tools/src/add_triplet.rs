//! Add triplet tool: store one extracted fact in the knowledge graph.

use crate::required_str;
use async_trait::async_trait;
use deepcontext_core::error::{StoreError, ToolError};
use deepcontext_core::tool::{Tool, ToolResult};
use deepcontext_store::{KnowledgeStore, Triplet};
use std::sync::Arc;
use tracing::warn;

pub struct AddTripletTool {
    store: Arc<KnowledgeStore>,
}

impl AddTripletTool {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddTripletTool {
    fn name(&self) -> &str {
        "add_triplet"
    }

    fn description(&self) -> &str {
        "Save a knowledge triplet (source_entity -relation-> target_entity) to the local knowledge graph. \
         Call this after reading a note, once for each core concept relationship you extracted."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "source_entity": {
                    "type": "string",
                    "description": "Entity A, e.g. \"MCP\""
                },
                "relation": {
                    "type": "string",
                    "description": "How A relates to B, e.g. \"decouples\""
                },
                "target_entity": {
                    "type": "string",
                    "description": "Entity B, e.g. \"LLM and local environment\""
                },
                "source_file": {
                    "type": "string",
                    "description": "The note this fact came from"
                }
            },
            "required": ["source_entity", "relation", "target_entity", "source_file"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let triplet = Triplet::new(
            required_str(&arguments, "source_entity")?,
            required_str(&arguments, "relation")?,
            required_str(&arguments, "target_entity")?,
            required_str(&arguments, "source_file")?,
        );

        match self.store.add_triplet(&triplet).await {
            Ok(id) => Ok(ToolResult::ok(format!(
                "Stored [{} -> {} -> {}] (source: {}, id: {id}).",
                triplet.source_entity, triplet.relation, triplet.target_entity, triplet.source_file
            ))),
            Err(StoreError::InvalidTriplet(reason)) => Ok(ToolResult::failed(format!(
                "Triplet not stored: {reason}."
            ))),
            Err(e) => {
                warn!(error = %e, "Triplet insert failed");
                Err(ToolError::ExecutionFailed {
                    tool_name: self.name().into(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
