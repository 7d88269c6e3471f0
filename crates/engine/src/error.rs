// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] oms_store::StoreError),

    #[error(transparent)]
    Registry(#[from] oms_registry::RegistryError),

    #[error("task {0} already claimed")]
    AlreadyClaimed(String),

    #[error("file contested: {0}")]
    FileContested(String),

    #[error("action {action} is not permitted for role {role}")]
    ForbiddenAction { role: String, action: String },

    #[error("command blocked by bash guard: {0}")]
    BashGuardBlocked(String),

    #[error("completion rejected: {0}")]
    CompletionRejected(String),

    #[error("supervisor error: {0}")]
    Supervisor(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
