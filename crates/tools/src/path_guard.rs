//! Path validation: confine note access to the notes root.
//!
//! Paths coming from the model are untrusted. `..` components are always
//! refused; when a root is configured, relative paths are resolved against it
//! and the resolved (symlink-free) path must stay inside it.

use std::path::{Component, Path, PathBuf};

/// Error returned when a path fails the sandbox check.
#[derive(Debug, thiserror::Error)]
pub enum PathGuardError {
    #[error("Path is empty")]
    Empty,

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' is outside the notes root")]
    OutsideRoot { path: String },
}

/// Where notes may be read from.
#[derive(Debug, Clone, Default)]
pub struct NotesSandbox {
    root: Option<PathBuf>,
}

impl NotesSandbox {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// No root: any path without `..` is accepted.
    pub fn unrestricted() -> Self {
        Self { root: None }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Validate `raw` and return the path to open.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, PathGuardError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathGuardError::Empty);
        }

        let input = Path::new(trimmed);
        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathGuardError::PathTraversal { path: raw.into() });
        }

        let Some(root) = &self.root else {
            return Ok(input.to_path_buf());
        };

        let candidate = if input.is_absolute() {
            input.to_path_buf()
        } else {
            root.join(input)
        };

        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());
        let canonical = match candidate.canonicalize() {
            Ok(path) => path,
            // Not on disk yet: judge it by where it would live.
            Err(_) if input.is_relative() => canonical_root.join(input),
            Err(_) => candidate.clone(),
        };

        if !canonical.starts_with(&canonical_root) {
            return Err(PathGuardError::OutsideRoot { path: raw.into() });
        }

        Ok(candidate)
    }
}
