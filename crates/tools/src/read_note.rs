//! Read note tool: the full UTF-8 text of one Markdown note.

use crate::path_guard::NotesSandbox;
use crate::{is_markdown, permission_denied, required_str};
use async_trait::async_trait;
use deepcontext_core::error::ToolError;
use deepcontext_core::tool::{Tool, ToolResult};
use tracing::debug;

pub struct ReadNoteTool {
    sandbox: NotesSandbox,
}

impl ReadNoteTool {
    pub fn new(sandbox: NotesSandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ReadNoteTool {
    fn name(&self) -> &str {
        "read_note"
    }

    fn description(&self) -> &str {
        "Read the full text of a Markdown (.md) note. \
         Use this when you need the contents of a specific note, e.g. to extract knowledge from it."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path of the .md file to read"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let file = self
            .sandbox
            .resolve(path)
            .map_err(|e| permission_denied(self.name(), e))?;

        if !is_markdown(&file) {
            return Ok(ToolResult::failed(
                "Only Markdown (.md) notes can be read.",
            ));
        }

        let metadata = match tokio::fs::metadata(&file).await {
            Ok(m) => m,
            Err(_) => {
                return Ok(ToolResult::failed(format!(
                    "Note '{path}' not found. Check that the path is correct."
                )));
            }
        };
        if !metadata.is_file() {
            return Ok(ToolResult::failed(format!(
                "'{path}' is not a file (it may be a directory)."
            )));
        }

        let bytes = match tokio::fs::read(&file).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(ToolResult::failed(format!("Failed to read note '{path}': {e}"))),
        };

        match String::from_utf8(bytes) {
            Ok(content) => {
                debug!(path, bytes = content.len(), "Read note");
                Ok(ToolResult::ok(format!("Note '{path}':\n\n{content}")))
            }
            Err(_) => Ok(ToolResult::failed(format!(
                "Note '{path}' is not valid UTF-8 text."
            ))),
        }
    }
}
