// SPDX-License-Identifier: MIT

//! The Agent Registry (§4.2): register/remove, active/terminal
//! classification, heartbeat-driven TTL expiry, and a capped per-agent
//! event/message-history buffer. Guarded by `parking_lot::Mutex` the way
//! the teacher's runtime monitor guards its live session table.

use crate::entry::{AgentEvent, AgentRegistryEntry, AgentStatus, HistoryMessage};
use crate::error::{RegistryError, RegistryResult};
use oms_core::{Clock, IssueId, RegistryId};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub enum RegistryNotification {
    Registered(RegistryId),
    Removed(RegistryId),
    Heartbeat(RegistryId),
    EventPushed(RegistryId),
    Expired(RegistryId),
}

struct AgentRecord {
    entry: AgentRegistryEntry,
    events: VecDeque<AgentEvent>,
    history: VecDeque<HistoryMessage>,
    heartbeat_in_flight: AtomicBool,
}

pub struct AgentRegistry {
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
    max_event_buffer: usize,
    message_history_max: usize,
    agents: Mutex<HashMap<RegistryId, AgentRecord>>,
    notify: broadcast::Sender<RegistryNotification>,
}

impl AgentRegistry {
    pub fn new(clock: Arc<dyn Clock>, ttl_ms: u64, max_event_buffer: usize, message_history_max: usize) -> Self {
        let (notify, _) = broadcast::channel(256);
        Self {
            clock,
            ttl_ms,
            max_event_buffer,
            message_history_max,
            agents: Mutex::new(HashMap::new()),
            notify,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryNotification> {
        self.notify.subscribe()
    }

    pub fn register(&self, agent_id: RegistryId, role: &str, pid: Option<u32>, task_id: Option<IssueId>) -> RegistryResult<()> {
        let mut agents = self.agents.lock();
        if agents.contains_key(&agent_id) {
            return Err(RegistryError::AlreadyRegistered(agent_id.to_string()));
        }
        let now = self.clock.epoch_ms();
        agents.insert(
            agent_id.clone(),
            AgentRecord {
                entry: AgentRegistryEntry {
                    agent_id: agent_id.clone(),
                    role: role.to_string(),
                    pid,
                    task_id,
                    status: AgentStatus::Active,
                    registered_at_ms: now,
                    last_heartbeat_ms: now,
                },
                events: VecDeque::new(),
                history: VecDeque::new(),
                heartbeat_in_flight: AtomicBool::new(false),
            },
        );
        tracing::info!(%agent_id, role, "agent registered");
        let _ = self.notify.send(RegistryNotification::Registered(agent_id));
        Ok(())
    }

    pub fn remove(&self, agent_id: &str) -> RegistryResult<()> {
        let mut agents = self.agents.lock();
        agents
            .remove(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        let _ = self.notify.send(RegistryNotification::Removed(RegistryId::new(agent_id)));
        Ok(())
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentRegistryEntry> {
        self.agents.lock().get(agent_id).map(|r| r.entry.clone())
    }

    pub fn get_active(&self) -> Vec<AgentRegistryEntry> {
        self.agents
            .lock()
            .values()
            .filter(|r| r.entry.status.is_active())
            .map(|r| r.entry.clone())
            .collect()
    }

    pub fn get_terminal(&self) -> Vec<AgentRegistryEntry> {
        self.agents
            .lock()
            .values()
            .filter(|r| r.entry.status.is_terminal())
            .map(|r| r.entry.clone())
            .collect()
    }

    pub fn get_all(&self) -> Vec<AgentRegistryEntry> {
        self.agents.lock().values().map(|r| r.entry.clone()).collect()
    }

    /// Records a heartbeat, skipping the update (rather than blocking) if
    /// another heartbeat for the same agent is already being processed.
    pub fn heartbeat(&self, agent_id: &str) -> RegistryResult<bool> {
        let mut agents = self.agents.lock();
        let record = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        if record
            .heartbeat_in_flight
            .swap(true, Ordering::AcqRel)
        {
            return Ok(false);
        }
        record.entry.last_heartbeat_ms = self.clock.epoch_ms();
        if record.entry.status.is_terminal() {
            record.entry.status = AgentStatus::Active;
        }
        record.heartbeat_in_flight.store(false, Ordering::Release);
        let _ = self.notify.send(RegistryNotification::Heartbeat(RegistryId::new(agent_id)));
        Ok(true)
    }

    pub fn push_event(&self, agent_id: &str, kind: &str, data: serde_json::Value) -> RegistryResult<()> {
        let mut agents = self.agents.lock();
        let record = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        let at_ms = self.clock.epoch_ms();
        record.events.push_back(AgentEvent {
            kind: kind.to_string(),
            data: data.clone(),
            at_ms,
        });
        while record.events.len() > self.max_event_buffer {
            record.events.pop_front();
        }
        if kind == "message" {
            if let Some(text) = data.get("content").and_then(|v| v.as_str()) {
                let role = data.get("role").and_then(|v| v.as_str()).unwrap_or("assistant");
                record.history.push_back(HistoryMessage {
                    role: role.to_string(),
                    content: text.to_string(),
                    at_ms,
                });
                while record.history.len() > self.message_history_max {
                    record.history.pop_front();
                }
            }
        }
        let _ = self.notify.send(RegistryNotification::EventPushed(RegistryId::new(agent_id)));
        Ok(())
    }

    /// Returns the agent's reconstructed message history, or an empty vec if
    /// the agent is unknown — not an error, since a caller racing removal
    /// against a read should see "nothing to show" rather than a failure.
    pub fn read_message_history(&self, agent_id: &str) -> Vec<HistoryMessage> {
        self.agents
            .lock()
            .get(agent_id)
            .map(|r| r.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn read_events(&self, agent_id: &str) -> Vec<AgentEvent> {
        self.agents
            .lock()
            .get(agent_id)
            .map(|r| r.events.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Marks every agent whose last heartbeat exceeds the TTL as terminal.
    /// Intended to be driven by a periodic task in the daemon (§4.2
    /// "heartbeat loop").
    pub fn sweep_expired(&self) -> Vec<RegistryId> {
        let now = self.clock.epoch_ms();
        let mut expired = Vec::new();
        let mut agents = self.agents.lock();
        for record in agents.values_mut() {
            if record.entry.status.is_active() && now.saturating_sub(record.entry.last_heartbeat_ms) > self.ttl_ms {
                record.entry.status = AgentStatus::Terminal {
                    reason: "ttl_expired".to_string(),
                };
                expired.push(record.entry.agent_id.clone());
            }
        }
        drop(agents);
        for id in &expired {
            tracing::warn!(agent_id = %id, ttl_ms = self.ttl_ms, "agent heartbeat ttl expired");
            let _ = self.notify.send(RegistryNotification::Expired(id.clone()));
        }
        expired
    }

    pub fn bind_task(&self, agent_id: &str, task_id: Option<IssueId>) -> RegistryResult<()> {
        let mut agents = self.agents.lock();
        let record = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        record.entry.task_id = task_id;
        Ok(())
    }

    pub fn mark_terminal(&self, agent_id: &str, reason: &str) -> RegistryResult<()> {
        let mut agents = self.agents.lock();
        let record = agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))?;
        record.entry.status = AgentStatus::Terminal {
            reason: reason.to_string(),
        };
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
