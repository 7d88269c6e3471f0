// SPDX-License-Identifier: MIT

//! Volatile per-agent state held by the registry (§3 DATA MODEL
//! "AgentRegistryEntry", §4.2). None of this is durable; it is rebuilt from
//! `register` calls issued as agents are spawned.

use oms_core::{IssueId, RegistryId};
use serde::{Deserialize, Serialize};

/// Coarse agent liveness classification. `Active` agents are heartbeating
/// within `OMS_AGENT_TTL_MS`; anything else is `Terminal` with a reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Terminal { reason: String },
}

impl AgentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AgentStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Terminal { .. })
    }
}

/// A point-in-time snapshot of a registered agent, returned by the read ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistryEntry {
    pub agent_id: RegistryId,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<IssueId>,
    pub status: AgentStatus,
    pub registered_at_ms: u64,
    pub last_heartbeat_ms: u64,
}

/// A single appended event in an agent's capped ring buffer
/// (`OMS_MAX_EVENT_BUFFER`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub kind: String,
    pub data: serde_json::Value,
    pub at_ms: u64,
}

/// A reconstructed message-history entry. Message bodies are not persisted
/// to disk (§3); this is a purely in-memory, capped view
/// (`OMS_MESSAGE_HISTORY_MAX`) derived from pushed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
    pub at_ms: u64,
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
