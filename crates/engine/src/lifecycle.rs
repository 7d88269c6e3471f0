// SPDX-License-Identifier: MIT

//! The lifecycle coordinator (§4.5): drives a task from `open` through a
//! bound, active agent to completion, and handles agent replacement /
//! forced stop without disturbing the task's own state unnecessarily.

use crate::error::EngineError;
use crate::scheduler;
use crate::supervisor::{ProcessSupervisor, Signal};
use oms_core::{Clock, IssueId, IssueStatus, RegistryId};
use oms_registry::AgentRegistry;
use oms_store::{TaskStore, UpdatePatch};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Which leg of the issuer → worker → finisher pipeline currently owns a
/// task (§4.5). Distinct from [`IssueStatus`]: the issue's own status stays
/// at the coarser open/in_progress/blocked/closed granularity, while this
/// tracks which role is expected to act on it next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    IssuerRunning,
    WorkerRunning,
    FinisherRunning,
}

/// Worker-class roles share one pipeline position: plain `worker`,
/// `designer` (restricted tool allowlist), and `fast-worker` (skips the
/// finisher leg via `fast_worker_close_task`).
fn stage_owner(stage: PipelineStage, role: &str) -> bool {
    match stage {
        PipelineStage::IssuerRunning => role == "issuer",
        PipelineStage::WorkerRunning => matches!(role, "worker" | "designer" | "fast-worker"),
        PipelineStage::FinisherRunning => role == "finisher",
    }
}

fn initial_stage(role: &str) -> PipelineStage {
    match role {
        "issuer" => PipelineStage::IssuerRunning,
        "finisher" => PipelineStage::FinisherRunning,
        _ => PipelineStage::WorkerRunning,
    }
}

pub struct LifecycleCoordinator {
    store: Arc<TaskStore>,
    registry: Arc<AgentRegistry>,
    supervisor: Arc<dyn ProcessSupervisor>,
    clock: Arc<dyn Clock>,
    stages: Mutex<HashMap<String, PipelineStage>>,
}

impl LifecycleCoordinator {
    pub fn new(store: Arc<TaskStore>, registry: Arc<AgentRegistry>, supervisor: Arc<dyn ProcessSupervisor>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            registry,
            supervisor,
            clock,
            stages: Mutex::new(HashMap::new()),
        }
    }

    /// Claims `task_id` for `agent_kind`, moves it to `in_progress`, spawns
    /// the subprocess, and registers it. Fails without any side effect if
    /// the task is not eligible (closed, already bound to an active agent).
    pub async fn claim_and_spawn(&self, task_id: &str, agent_kind: &str, role: &str, actor: &str) -> Result<RegistryId, EngineError> {
        let issues = self.store.list().await;
        let agents = self.registry.get_all();
        scheduler::try_claim(&issues, &agents, task_id, "")?;

        self.store
            .update(
                task_id,
                actor,
                UpdatePatch {
                    status: Some(IssueStatus::InProgress),
                    ..Default::default()
                },
            )
            .await?;

        let spawned = self
            .supervisor
            .spawn(agent_kind, task_id, json!({ "taskId": task_id }))
            .await?;
        let agent_id = RegistryId::new(spawned.agent_id);
        self.registry
            .register(agent_id.clone(), role, spawned.pid, Some(IssueId::new(task_id)))
            .map_err(EngineError::Registry)?;
        self.stages.lock().insert(task_id.to_string(), initial_stage(role));
        Ok(agent_id)
    }

    /// Kills every active agent bound to `task_id` and spawns a fresh one in
    /// its place; the task's own status is left untouched (it was already
    /// `in_progress`).
    pub async fn replace_agent(&self, task_id: &str, agent_kind: &str, role: &str) -> Result<RegistryId, EngineError> {
        self.stop_agents_for_task(task_id, Signal::Terminate).await?;
        let spawned = self
            .supervisor
            .spawn(agent_kind, task_id, json!({ "taskId": task_id, "replacement": true }))
            .await?;
        let agent_id = RegistryId::new(spawned.agent_id);
        self.registry
            .register(agent_id.clone(), role, spawned.pid, Some(IssueId::new(task_id)))
            .map_err(EngineError::Registry)?;
        self.stages.lock().insert(task_id.to_string(), initial_stage(role));
        Ok(agent_id)
    }

    /// Kills and retires every active agent bound to `task_id`, without
    /// spawning a replacement.
    pub async fn stop_agents_for_task(&self, task_id: &str, signal: Signal) -> Result<(), EngineError> {
        let bound: Vec<_> = self
            .registry
            .get_active()
            .into_iter()
            .filter(|a| a.task_id.as_ref().map(|t| t.as_str() == task_id).unwrap_or(false))
            .collect();
        for agent in bound {
            self.supervisor.kill(agent.agent_id.as_str(), signal).await?;
            self.registry
                .mark_terminal(agent.agent_id.as_str(), "stopped")
                .map_err(EngineError::Registry)?;
        }
        Ok(())
    }

    /// The pipeline stage currently driving `task_id`, if any agent has
    /// claimed it.
    pub fn current_stage(&self, task_id: &str) -> Option<PipelineStage> {
        self.stages.lock().get(task_id).copied()
    }

    /// Records a lifecycle signal from `role` against `task_id` (§4.5):
    /// `start`/`skip`/`defer` from the issuer, `done`/`escalate`/`advance`
    /// from a worker-class role, `close`/`reopen` from the finisher.
    /// Invalid actions for the caller's stage, and `advance` targets outside
    /// the role's allowed set, are rejected without mutating anything.
    pub async fn advance_lifecycle(&self, task_id: &str, role: &str, action: &str, target: Option<&str>, actor: &str) -> Result<PipelineStage, EngineError> {
        let current = self.current_stage(task_id).unwrap_or(PipelineStage::IssuerRunning);
        if !stage_owner(current, role) {
            return Err(EngineError::ForbiddenAction {
                role: role.to_string(),
                action: action.to_string(),
            });
        }

        let next = match (current, action) {
            (PipelineStage::IssuerRunning, "start") => PipelineStage::WorkerRunning,
            (PipelineStage::IssuerRunning, "skip") => PipelineStage::FinisherRunning,
            (PipelineStage::IssuerRunning, "defer") => {
                self.defer_task(task_id, actor).await?;
                return Ok(current);
            }
            (PipelineStage::WorkerRunning, "done") => PipelineStage::FinisherRunning,
            (PipelineStage::WorkerRunning, "escalate") => {
                self.escalate_task(task_id, actor).await?;
                return Ok(current);
            }
            (PipelineStage::WorkerRunning, "advance") => {
                let target = target.ok_or_else(|| EngineError::ForbiddenAction {
                    role: role.to_string(),
                    action: "advance (missing target)".to_string(),
                })?;
                if target != "finisher" {
                    return Err(EngineError::ForbiddenAction {
                        role: role.to_string(),
                        action: format!("advance to {target}"),
                    });
                }
                PipelineStage::FinisherRunning
            }
            (PipelineStage::FinisherRunning, "close") => {
                self.store.close(task_id, actor, None).await?;
                self.stages.lock().remove(task_id);
                return Ok(current);
            }
            (PipelineStage::FinisherRunning, "reopen") => {
                self.store
                    .update(task_id, actor, UpdatePatch { status: Some(IssueStatus::Open), ..Default::default() })
                    .await?;
                self.stages.lock().remove(task_id);
                return Ok(PipelineStage::IssuerRunning);
            }
            _ => {
                return Err(EngineError::ForbiddenAction {
                    role: role.to_string(),
                    action: action.to_string(),
                })
            }
        };
        self.stages.lock().insert(task_id.to_string(), next);
        Ok(next)
    }

    async fn defer_task(&self, task_id: &str, actor: &str) -> Result<(), EngineError> {
        self.store
            .update(task_id, actor, UpdatePatch { status: Some(IssueStatus::Deferred), ..Default::default() })
            .await?;
        Ok(())
    }

    async fn escalate_task(&self, task_id: &str, actor: &str) -> Result<(), EngineError> {
        self.store
            .update(task_id, actor, UpdatePatch { status: Some(IssueStatus::Blocked), ..Default::default() })
            .await?;
        self.store.comment(task_id, actor, "escalated: blocked pending steering review").await?;
        Ok(())
    }

    /// `fast_worker_close_task` (§4.8): a fast-worker closes its own task
    /// directly, bypassing the finisher leg entirely.
    pub async fn fast_worker_close_task(&self, task_id: &str, actor: &str) -> Result<(), EngineError> {
        let current = self.current_stage(task_id).unwrap_or(PipelineStage::WorkerRunning);
        if !stage_owner(current, "fast-worker") {
            return Err(EngineError::ForbiddenAction {
                role: "fast-worker".to_string(),
                action: "close_task".to_string(),
            });
        }
        self.store.close(task_id, actor, None).await?;
        self.stages.lock().remove(task_id);
        Ok(())
    }

    /// `finisher_close_task` (§4.8): the finisher's own shorthand for
    /// `advance_lifecycle(action=close)`.
    pub async fn finisher_close_task(&self, task_id: &str, actor: &str) -> Result<(), EngineError> {
        self.advance_lifecycle(task_id, "finisher", "close", None, actor).await?;
        Ok(())
    }

    pub fn now(&self) -> String {
        self.clock.now_iso8601()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
