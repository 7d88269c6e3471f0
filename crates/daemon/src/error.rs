// SPDX-License-Identifier: MIT

//! Top-level daemon error: everything a connection handler can fail with,
//! collapsed into one enum so `listener.rs` has a single place to turn a
//! failure into a wire [`crate::protocol::Response`] with `ok: false`.

use oms_engine::EngineError;
use oms_registry::RegistryError;
use oms_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("forbidden: role {role} may not invoke {action}")]
    Forbidden { role: String, action: String },

    #[error("bash command blocked: {0}")]
    BashBlocked(String),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("missing required environment variable {0}")]
    MissingEnv(String),

    #[error("invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DaemonError {
    /// A short, stable machine-readable category for the wire response —
    /// deliberately coarser than the `Display` message.
    pub fn category(&self) -> &'static str {
        match self {
            DaemonError::Store(StoreError::NotFound(_)) => "not_found",
            DaemonError::Store(StoreError::ClosedIssue(_)) => "closed_issue",
            DaemonError::Store(StoreError::Conflict(_)) => "conflict",
            DaemonError::Store(_) => "store_error",
            DaemonError::Registry(_) => "registry_error",
            DaemonError::Engine(EngineError::AlreadyClaimed(_)) => "already_claimed",
            DaemonError::Engine(EngineError::FileContested(_)) => "file_contested",
            DaemonError::Engine(EngineError::CompletionRejected(_)) => "completion_rejected",
            DaemonError::Engine(_) => "engine_error",
            DaemonError::Forbidden { .. } => "forbidden",
            DaemonError::BashBlocked(_) => "bash_blocked",
            DaemonError::BadRequest(_) => "bad_request",
            DaemonError::MissingEnv(_) | DaemonError::InvalidEnv { .. } => "config_error",
            DaemonError::Io(_) => "io_error",
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
