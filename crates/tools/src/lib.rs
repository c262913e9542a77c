//! Tools served to the DeepContext agent.
//!
//! Two families: note access (list and read Markdown files under the notes
//! root) and the knowledge graph (store triplets, query them with SQL).

pub mod add_triplet;
pub mod list_notes;
pub mod path_guard;
pub mod query_graph;
pub mod read_note;

pub use path_guard::{NotesSandbox, PathGuardError};

use deepcontext_core::error::ToolError;
use deepcontext_core::tool::ToolRegistry;
use deepcontext_store::KnowledgeStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Create the registry of all DeepContext tools.
///
/// Catalog order: `list_notes`, `read_note`, `add_triplet`, `query_graph`.
/// With `notes_root` set, note tools cannot leave that directory.
pub fn default_registry(store: Arc<KnowledgeStore>, notes_root: Option<PathBuf>) -> ToolRegistry {
    let sandbox = NotesSandbox::new(notes_root);
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(list_notes::ListNotesTool::new(sandbox.clone())));
    registry.register(Box::new(read_note::ReadNoteTool::new(sandbox)));
    registry.register(Box::new(add_triplet::AddTripletTool::new(store.clone())));
    registry.register(Box::new(query_graph::QueryGraphTool::new(store)));
    registry
}

/// Fetch a required string argument.
pub(crate) fn required_str<'a>(
    arguments: &'a serde_json::Value,
    key: &str,
) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

pub(crate) fn permission_denied(tool_name: &str, err: PathGuardError) -> ToolError {
    ToolError::PermissionDenied {
        tool_name: tool_name.into(),
        reason: err.to_string(),
    }
}

pub(crate) fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_catalog_order() {
        let store = Arc::new(KnowledgeStore::in_memory().await.unwrap());
        let registry = default_registry(store, None);
        assert_eq!(
            registry.names(),
            vec!["list_notes", "read_note", "add_triplet", "query_graph"]
        );
    }

    #[tokio::test]
    async fn every_schema_is_an_object_with_required_fields() {
        let store = Arc::new(KnowledgeStore::in_memory().await.unwrap());
        for descriptor in default_registry(store, None).descriptors() {
            assert_eq!(descriptor.input_schema["type"], "object", "{}", descriptor.name);
            assert!(descriptor.input_schema["required"].is_array(), "{}", descriptor.name);
            assert!(!descriptor.description.is_empty());
        }
    }

    #[test]
    fn markdown_detection() {
        assert!(is_markdown(Path::new("a.md")));
        assert!(is_markdown(Path::new("dir/B.MD")));
        assert!(!is_markdown(Path::new("a.txt")));
        assert!(!is_markdown(Path::new("md")));
    }

    #[test]
    fn required_str_reports_key() {
        let err = required_str(&serde_json::json!({"x": 1}), "x").unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }
}
