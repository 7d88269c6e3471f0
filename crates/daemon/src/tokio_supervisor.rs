// SPDX-License-Identifier: MIT

//! The real [`ProcessSupervisor`]: spawns agent subprocesses with
//! `tokio::process::Command` and signals them with `nix` (§6 PROCESS
//! SUPERVISOR CONTRACT). Every other crate talks to agents only through the
//! trait; this is the one module that actually forks.

use async_trait::async_trait;
use oms_engine::{EngineError, ProcessSupervisor, Signal, SpawnedAgent};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::process::{Child, Command};

fn to_nix_signal(signal: Signal) -> nix::sys::signal::Signal {
    use nix::sys::signal::Signal as NixSignal;
    match signal {
        Signal::Interrupt => NixSignal::SIGINT,
        Signal::Terminate => NixSignal::SIGTERM,
        Signal::Kill => NixSignal::SIGKILL,
    }
}

/// Launches each agent as `<command> <agent_kind> <task_id>` with the
/// spawn context serialized into `OMS_SPAWN_CONTEXT`. `command` and
/// `working_dir` are fixed at construction; real deployments point
/// `command` at the orchestrator's agent launcher script.
pub struct TokioProcessSupervisor {
    command: String,
    working_dir: std::path::PathBuf,
    children: Mutex<HashMap<String, Child>>,
}

impl TokioProcessSupervisor {
    pub fn new(command: impl Into<String>, working_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.into(),
            children: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ProcessSupervisor for TokioProcessSupervisor {
    async fn spawn(&self, agent_kind: &str, task_id: &str, context: Value) -> Result<SpawnedAgent, EngineError> {
        let agent_id = format!("agent-{agent_kind}-{task_id}-{}", uuid::Uuid::new_v4());
        let child = Command::new(&self.command)
            .arg(agent_kind)
            .arg(task_id)
            .env("OMS_SPAWN_CONTEXT", context.to_string())
            .env("OMS_AGENT_ID", &agent_id)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Supervisor(format!("spawn failed: {e}")))?;

        let pid = child.id();
        self.children.lock().insert(agent_id.clone(), child);
        Ok(SpawnedAgent { agent_id, pid })
    }

    async fn kill(&self, agent_id: &str, signal: Signal) -> Result<(), EngineError> {
        let pid = {
            let children = self.children.lock();
            children.get(agent_id).and_then(|c| c.id())
        };
        let Some(pid) = pid else {
            return Ok(());
        };
        let nix_pid = nix::unistd::Pid::from_raw(pid as i32);
        nix::sys::signal::kill(nix_pid, to_nix_signal(signal)).map_err(|e| EngineError::Supervisor(format!("signal failed: {e}")))?;
        if matches!(signal, Signal::Kill) {
            self.children.lock().remove(agent_id);
        }
        Ok(())
    }

    fn is_alive(&self, agent_id: &str) -> bool {
        let mut children = self.children.lock();
        match children.get_mut(agent_id) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "tokio_supervisor_tests.rs"]
mod tests;
