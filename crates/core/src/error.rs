// SPDX-License-Identifier: MIT

//! Shared error categories (§7 ERROR HANDLING DESIGN). Crates downstream of
//! `oms-core` wrap `CoreError` in their own error enum rather than
//! re-deriving these variants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("issue not found: {0}")]
    NotFound(String),

    #[error("issue {0} is closed")]
    ClosedIssue(String),

    #[error("issue {0} cannot depend on itself")]
    SelfDependency(String),

    #[error("unknown dependency: {0}")]
    UnknownDependency(String),

    #[error("dependency cycle detected: {0}")]
    CycleDetected(String),

    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("batch must contain at least one item")]
    EmptyBatch,

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("invalid status {status} for issue type {issue_type}")]
    InvalidStatus { status: String, issue_type: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
