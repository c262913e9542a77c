//! Query graph tool: read-only SQL over the knowledge graph.
//!
//! Bad SQL is reported back as text rather than as a tool error so the model
//! can read the message and correct its statement.

use crate::required_str;
use async_trait::async_trait;
use deepcontext_core::error::{StoreError, ToolError};
use deepcontext_core::tool::{Tool, ToolResult};
use deepcontext_store::{KnowledgeStore, QueryRows};
use std::sync::Arc;
use tracing::debug;

const SEPARATOR_WIDTH: usize = 50;

pub struct QueryGraphTool {
    store: Arc<KnowledgeStore>,
}

impl QueryGraphTool {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for QueryGraphTool {
    fn name(&self) -> &str {
        "query_graph"
    }

    fn description(&self) -> &str {
        "Run a read-only SQL SELECT against the local knowledge graph. \
         Use this to answer questions about knowledge that was already stored. \
         Schema: table knowledge_triplets(id INTEGER, source_entity TEXT, relation TEXT, \
         target_entity TEXT, source_file TEXT, created_at TIMESTAMP). Only SELECT is allowed."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "sql_query": {
                    "type": "string",
                    "description": "A single SELECT statement over knowledge_triplets"
                }
            },
            "required": ["sql_query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let sql = required_str(&arguments, "sql_query")?;

        match self.store.query(sql).await {
            Ok(rows) if rows.is_empty() => Ok(ToolResult::ok(format!(
                "Query succeeded: '{sql}', but no matching rows were found."
            ))),
            Ok(rows) => {
                debug!(rows = rows.len(), "Graph query answered");
                Ok(ToolResult::ok(format_rows(sql, &rows)))
            }
            Err(StoreError::ReadOnlyViolation(reason)) => Ok(ToolResult::failed(format!(
                "Query rejected: {reason}. Only SELECT queries may be run against the knowledge graph."
            ))),
            Err(StoreError::QueryFailed(reason)) => Ok(ToolResult::failed(format!(
                "SQL error: {reason}. Check your SQL statement and try again."
            ))),
            Err(e) => Err(ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            }),
        }
    }
}

/// Header, separator, then one `|`-joined line per row.
fn format_rows(sql: &str, rows: &QueryRows) -> String {
    let mut output = format!("Query succeeded: '{sql}'\nFound {} row(s):\n", rows.len());
    output.push_str(&rows.columns.join(" | "));
    output.push('\n');
    output.push_str(&"-".repeat(SEPARATOR_WIDTH));
    output.push('\n');
    for row in &rows.rows {
        output.push_str(&row.join(" | "));
        output.push('\n');
    }
    output
}
