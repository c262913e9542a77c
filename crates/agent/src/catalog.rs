//! Capability catalog adapter.
//!
//! Turns the tool server's descriptors into the provider-neutral entries the
//! oracle receives.

use deepcontext_core::provider::CatalogEntry;
use deepcontext_core::tool::ToolDescriptor;

/// Adapt descriptors one-to-one, preserving order.
///
/// The parameter schema is carried over unchanged.
pub fn adapt(descriptors: &[ToolDescriptor]) -> Vec<CatalogEntry> {
    descriptors.iter().map(adapt_one).collect()
}

fn adapt_one(descriptor: &ToolDescriptor) -> CatalogEntry {
    CatalogEntry {
        name: descriptor.name.clone(),
        description: descriptor.description.clone(),
        parameters: descriptor.input_schema.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(name: &str, schema: serde_json::Value) -> ToolDescriptor {
        ToolDescriptor {
            name: name.into(),
            description: format!("{name} tool"),
            input_schema: schema,
        }
    }

    #[test]
    fn schema_is_structurally_identical() {
        let schema = json!({"type": "object", "properties": {"a": {"type": "integer"}}});
        let adapted = adapt(&[descriptor("count", schema.clone())]);
        assert_eq!(adapted.len(), 1);
        assert_eq!(adapted[0].name, "count");
        assert_eq!(adapted[0].description, "count tool");
        assert_eq!(adapted[0].parameters, schema);
    }

    #[test]
    fn order_is_preserved() {
        let input: Vec<_> = ["query_graph", "list_notes", "add_triplet"]
            .iter()
            .map(|n| descriptor(n, json!({"type": "object"})))
            .collect();
        let names: Vec<_> = adapt(&input).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["query_graph", "list_notes", "add_triplet"]);
    }

    #[test]
    fn empty_catalog_adapts_to_empty() {
        assert!(adapt(&[]).is_empty());
    }

    #[test]
    fn input_is_not_mutated() {
        let input = vec![descriptor("x", json!({"type": "object", "required": ["p"]}))];
        let before = input.clone();
        let _ = adapt(&input);
        assert_eq!(input, before);
    }
}
