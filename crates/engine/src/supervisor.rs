// SPDX-License-Identifier: MIT

//! The process supervisor contract (§6 "process supervisor contract"):
//! the engine consumes `spawn`/`kill` without knowing how agent subprocesses
//! are actually started — `oms-daemon` wires in the real implementation,
//! tests wire in [`FakeSupervisor`].

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Interrupt,
    Terminate,
    Kill,
}

#[derive(Debug, Clone)]
pub struct SpawnedAgent {
    pub agent_id: String,
    pub pid: Option<u32>,
}

#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    async fn spawn(&self, agent_kind: &str, task_id: &str, context: Value) -> Result<SpawnedAgent, crate::error::EngineError>;
    async fn kill(&self, agent_id: &str, signal: Signal) -> Result<(), crate::error::EngineError>;
    fn is_alive(&self, agent_id: &str) -> bool;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    pub struct FakeSupervisor {
        alive: Mutex<HashSet<String>>,
        next_pid: AtomicU64,
        pub killed: Mutex<Vec<(String, Signal)>>,
        pub spawned: Mutex<Vec<(String, String)>>,
    }

    impl FakeSupervisor {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }
    }

    #[async_trait]
    impl ProcessSupervisor for FakeSupervisor {
        async fn spawn(&self, agent_kind: &str, task_id: &str, _context: Value) -> Result<SpawnedAgent, crate::error::EngineError> {
            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst) + 1;
            let agent_id = format!("agent-{agent_kind}-{pid}");
            self.alive.lock().insert(agent_id.clone());
            self.spawned.lock().push((agent_id.clone(), task_id.to_string()));
            Ok(SpawnedAgent {
                agent_id,
                pid: Some(pid as u32),
            })
        }

        async fn kill(&self, agent_id: &str, signal: Signal) -> Result<(), crate::error::EngineError> {
            self.alive.lock().remove(agent_id);
            self.killed.lock().push((agent_id.to_string(), signal));
            Ok(())
        }

        fn is_alive(&self, agent_id: &str) -> bool {
            self.alive.lock().contains(agent_id)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeSupervisor;

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
