// SPDX-License-Identifier: MIT

//! Unix-socket daemon binding the task store, agent registry, and lifecycle
//! engine into one process per orchestration session (§4.4-§4.5, §5).

pub mod config;
pub mod error;
pub mod listener;
pub mod protocol;
pub mod state;

#[cfg(unix)]
pub mod tokio_supervisor;

pub use config::DaemonConfig;
pub use error::DaemonError;
pub use listener::Listener;
pub use state::DaemonState;

#[cfg(unix)]
pub use tokio_supervisor::TokioProcessSupervisor;
