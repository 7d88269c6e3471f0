// SPDX-License-Identifier: MIT

use super::*;
use serde_json::json;

#[tokio::test]
async fn spawn_then_kill_stops_the_child() {
    // `yes` happily repeats whatever args it's given forever, so it stays
    // alive regardless of what `spawn` passes as agent_kind/task_id.
    let supervisor = TokioProcessSupervisor::new("yes", std::env::temp_dir());
    let spawned = supervisor.spawn("worker", "task-1", json!({})).await.unwrap();
    assert!(spawned.pid.is_some());
    assert!(supervisor.is_alive(&spawned.agent_id));

    supervisor.kill(&spawned.agent_id, Signal::Kill).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!supervisor.is_alive(&spawned.agent_id));
}

#[tokio::test]
async fn kill_of_unknown_agent_is_a_noop() {
    let supervisor = TokioProcessSupervisor::new("yes", std::env::temp_dir());
    supervisor.kill("no-such-agent", Signal::Terminate).await.unwrap();
}
