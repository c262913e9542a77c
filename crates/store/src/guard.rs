//! Read-only gate for model-written SQL.
//!
//! Checked before the database is touched. The query itself also runs inside
//! a transaction that is always rolled back, so a statement that slips past
//! this check (e.g. a `WITH ... DELETE`) still leaves the graph unchanged.

use deepcontext_core::error::StoreError;

const ALLOWED_PREFIXES: &[&str] = &["SELECT", "WITH"];

/// Accept a single `SELECT`/`WITH` statement, optionally `;`-terminated.
///
/// Returns the statement with surrounding whitespace and trailing `;` removed.
pub fn ensure_read_only(sql: &str) -> Result<&str, StoreError> {
    let statement = sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());

    if statement.is_empty() {
        return Err(StoreError::ReadOnlyViolation("empty query".into()));
    }

    let head: String = statement
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    if !ALLOWED_PREFIXES.contains(&head.as_str()) {
        return Err(StoreError::ReadOnlyViolation(format!(
            "only SELECT queries are allowed, got: {}",
            preview(statement)
        )));
    }

    if statement.contains(';') {
        return Err(StoreError::ReadOnlyViolation(
            "multiple statements are not allowed".into(),
        ));
    }

    Ok(statement)
}

fn preview(sql: &str) -> String {
    let mut s: String = sql.chars().take(40).collect();
    if sql.chars().count() > 40 {
        s.push_str("...");
    }
    s
}
