// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("agent not registered: {0}")]
    NotFound(String),

    #[error("agent {0} already registered")]
    AlreadyRegistered(String),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
