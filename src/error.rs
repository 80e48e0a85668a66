//! Error types for the search engine core
//!
//! Application layers (CLI, server, store) use `anyhow`; the engine keeps
//! typed errors so callers can tell a bad path from a failed subprocess.

use std::path::PathBuf;
use thiserror::Error;

/// Path normalization / containment failures (the "invalid path" family)
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Invalid path {0}: parent traversal is not allowed")]
    ParentTraversal(PathBuf),

    #[error("Invalid path {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid path {0}: not a directory")]
    NotADirectory(PathBuf),
}

/// Conditions that abort a whole search
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid query pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to start search engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Search engine '{program}' failed (exit code {code:?}): {stderr}")]
    Subprocess {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to resolve search scope: {0}")]
    Scope(#[from] anyhow::Error),
}
