//! List notes tool: the Markdown files in one directory.

use crate::path_guard::NotesSandbox;
use crate::{is_markdown, permission_denied, required_str};
use async_trait::async_trait;
use deepcontext_core::error::ToolError;
use deepcontext_core::tool::{Tool, ToolResult};
use tracing::debug;

pub struct ListNotesTool {
    sandbox: NotesSandbox,
}

impl ListNotesTool {
    pub fn new(sandbox: NotesSandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for ListNotesTool {
    fn name(&self) -> &str {
        "list_notes"
    }

    fn description(&self) -> &str {
        "List all Markdown (.md) notes in a local directory. \
         Use this first to discover which notes exist before reading them."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (relative paths resolve against the notes root)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let dir = self
            .sandbox
            .resolve(path)
            .map_err(|e| permission_denied(self.name(), e))?;

        if !tokio::fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Ok(ToolResult::failed(format!(
                "Directory '{path}' does not exist or is not a directory."
            )));
        }

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => return Ok(ToolResult::failed(format!("Failed to read directory '{path}': {e}"))),
        };

        let mut notes = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
                    let entry_path = entry.path();
                    if is_file && is_markdown(&entry_path) {
                        notes.push(entry.file_name().to_string_lossy().into_owned());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    return Ok(ToolResult::failed(format!(
                        "Failed to read directory '{path}': {e}"
                    )));
                }
            }
        }
        notes.sort();
        debug!(path, count = notes.len(), "Listed notes");

        if notes.is_empty() {
            return Ok(ToolResult::ok(format!(
                "No Markdown (.md) notes found in '{path}'."
            )));
        }

        let mut output = format!("Directory '{path}' contains {} note(s):\n", notes.len());
        for (i, name) in notes.iter().enumerate() {
            output.push_str(&format!("{}. {name}\n", i + 1));
        }
        Ok(ToolResult::ok(output))
    }
}
