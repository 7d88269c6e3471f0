// SPDX-License-Identifier: MIT

//! Task Store error categories (§7 ERROR HANDLING DESIGN).

use oms_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("issue not found: {0}")]
    NotFound(String),

    #[error("issue {0} is closed")]
    ClosedIssue(String),

    #[error("{0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<CoreError> for StoreError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(id) => StoreError::NotFound(id),
            CoreError::ClosedIssue(id) => StoreError::ClosedIssue(id),
            CoreError::Io(e) => StoreError::Io(e),
            CoreError::Serde(e) => StoreError::Serde(e),
            other => StoreError::Validation(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
