//! Error types for the DeepContext domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator (oracle, tool server, store) has its own error enum;
//! the top-level [`Error`] is what a run surfaces to its caller.

use thiserror::Error;

/// The top-level error type for all DeepContext operations.
///
/// Only failures the agent loop cannot recover from end up here. Tool-level
/// failures inside a run are turned into transcript entries instead.
#[derive(Debug, Error)]
pub enum Error {
    // --- Oracle errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool catalog could not be fetched at run start ---
    #[error("Tool catalog unavailable: {0}")]
    Catalog(ToolError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool server transport failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Only read-only queries are allowed: {0}")]
    ReadOnlyViolation(String),

    #[error("Invalid triplet: {0}")]
    InvalidTriplet(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn catalog_error_is_distinct_from_tool_error() {
        let err = Error::Catalog(ToolError::Transport("broken pipe".into()));
        assert!(err.to_string().starts_with("Tool catalog unavailable"));
        assert!(err.to_string().contains("broken pipe"));
    }

    #[test]
    fn provider_error_converts_into_error() {
        let err: Error = ProviderError::Timeout("120s".into()).into();
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(_))));
    }
}
