// SPDX-License-Identifier: MIT

//! Daemon configuration, entirely env-var driven (§5 RUNTIME CONFIGURATION):
//! the daemon is launched once per session by the orchestrator, which sets
//! these variables rather than passing flags.

use crate::error::DaemonError;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub task_id: Option<String>,
    pub agent_id: Option<String>,
    pub actor: String,
    pub session_dir: PathBuf,
    pub role: Option<String>,
    pub heartbeat_interval_ms: u64,
    pub agent_ttl_ms: u64,
    pub max_agent_issues: usize,
    pub max_event_buffer: usize,
    pub max_activity_log: usize,
    pub message_history_max: usize,
}

fn required_path(name: &str) -> Result<PathBuf, DaemonError> {
    std::env::var(name).map(PathBuf::from).map_err(|_| DaemonError::MissingEnv(name.to_string()))
}

fn env_u64(name: &str, default: u64) -> Result<u64, DaemonError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => v.parse().map_err(|_| DaemonError::InvalidEnv {
            name: name.to_string(),
            value: v,
        }),
    }
}

fn env_usize(name: &str, default: usize) -> Result<usize, DaemonError> {
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(v) => v.parse().map_err(|_| DaemonError::InvalidEnv {
            name: name.to_string(),
            value: v,
        }),
    }
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self, DaemonError> {
        Ok(Self {
            socket_path: required_path("OMS_SOCKET_PATH")?,
            task_id: std::env::var("OMS_TASK_ID").ok(),
            agent_id: std::env::var("OMS_AGENT_ID").ok(),
            actor: std::env::var("OMS_ACTOR").unwrap_or_else(|_| "system".to_string()),
            session_dir: required_path("OMS_SESSION_DIR")?,
            role: std::env::var("OMS_ROLE").ok(),
            heartbeat_interval_ms: env_u64("OMS_HEARTBEAT_INTERVAL_MS", 5_000)?,
            agent_ttl_ms: env_u64("OMS_AGENT_TTL_MS", 120_000)?,
            max_agent_issues: env_usize("OMS_MAX_AGENT_ISSUES", 500)?,
            max_event_buffer: env_usize("OMS_MAX_EVENT_BUFFER", 200)?,
            max_activity_log: env_usize("OMS_MAX_ACTIVITY_LOG", 5_000)?,
            message_history_max: env_usize("OMS_MESSAGE_HISTORY_MAX", 200)?,
        })
    }

    /// The store's on-disk root: the tasks directory lives under the
    /// session directory so each session's tracker state is self-contained.
    pub fn store_root(&self) -> PathBuf {
        self.session_dir.clone()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
