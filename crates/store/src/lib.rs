//! Knowledge-graph persistence for DeepContext.
//!
//! Facts extracted from notes are stored as triplets
//! (`source_entity -relation-> target_entity`) in a single SQLite table,
//! together with the note they came from. The model reads the graph back
//! through free-form, read-only SQL.

pub mod guard;
pub mod sqlite;

pub use guard::ensure_read_only;
pub use sqlite::KnowledgeStore;

use serde::{Deserialize, Serialize};

/// Name of the single table holding the graph.
pub const TRIPLETS_TABLE: &str = "knowledge_triplets";

/// One fact of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triplet {
    /// Entity A (e.g. "MCP")
    pub source_entity: String,

    /// How A relates to B (e.g. "decouples")
    pub relation: String,

    /// Entity B
    pub target_entity: String,

    /// The note this fact was extracted from
    pub source_file: String,
}

impl Triplet {
    pub fn new(
        source_entity: impl Into<String>,
        relation: impl Into<String>,
        target_entity: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            source_entity: source_entity.into(),
            relation: relation.into(),
            target_entity: target_entity.into(),
            source_file: source_file.into(),
        }
    }

    /// Names of the fields that are empty or whitespace-only.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("source_entity", &self.source_entity),
            ("relation", &self.relation),
            ("target_entity", &self.target_entity),
            ("source_file", &self.source_file),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| k)
        .collect()
    }
}

/// The text rendering of a query result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRows {
    /// Column names, in select order. Empty when no row came back.
    pub columns: Vec<String>,

    /// One entry per row, each cell rendered as text.
    pub rows: Vec<Vec<String>>,
}

impl QueryRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
