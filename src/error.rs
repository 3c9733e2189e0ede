//! Error types for content store operations

use crate::validate::ValidationIssue;
use thiserror::Error;

/// Content operation result type
pub type Result<T> = std::result::Result<T, ContentError>;

/// Content store errors
#[derive(Error, Debug)]
pub enum ContentError {
    /// Content item does not exist
    #[error("Content not found: {0}")]
    NotFound(String),

    /// Content id already exists
    #[error("Content already exists: {0}")]
    DuplicateId(String),

    /// Validation produced one or more errors; the operation stored nothing
    #[error("Validation failed: {}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// Malformed input (missing type, non-object payload, bad enum value)
    #[error("Invalid input: {0}")]
    BadInput(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (loader only)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}
