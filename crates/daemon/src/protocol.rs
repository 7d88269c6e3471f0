// SPDX-License-Identifier: MIT

//! The wire protocol (§4.4 IPC VERBS): one JSON object per line over the
//! Unix socket, request in, response out. Deliberately newline-delimited
//! rather than length-prefixed — the payloads are small and line framing is
//! trivial to pipe through `nc`/`socat` while debugging a session by hand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    Ready,
    List,
    Show {
        id: String,
    },
    Create {
        title: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        issue_type: Option<String>,
        #[serde(default)]
        priority: Option<u8>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        acceptance_criteria: Option<String>,
        #[serde(default)]
        labels: Option<Vec<String>>,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        scope: Option<String>,
        #[serde(default)]
        depends_on: Option<Vec<String>>,
    },
    CreateBatch {
        items: Vec<BatchItemWire>,
    },
    Update {
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        acceptance_criteria: Option<String>,
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        priority: Option<u8>,
        #[serde(default)]
        add_labels: Option<Vec<String>>,
        #[serde(default)]
        assignee: Option<String>,
        #[serde(default)]
        scope: Option<String>,
    },
    Close {
        id: String,
    },
    Comment {
        id: String,
        author: String,
        text: String,
    },
    DepAdd {
        id: String,
        depends_on: String,
        #[serde(default)]
        kind: Option<String>,
    },
    DepTree {
        id: String,
    },
    Search {
        query: String,
    },
    Query {
        #[serde(default)]
        status: Option<String>,
        #[serde(default)]
        issue_type: Option<String>,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        assignee: Option<String>,
    },
    Delete {
        id: String,
    },
    Activity,
    SetAgentLog {
        id: String,
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        close_reason: Option<String>,
    },
    ClaimAndSpawn {
        task_id: String,
        agent_kind: String,
        role: String,
    },
    ReplaceAgent {
        task_id: String,
        agent_kind: String,
        role: String,
    },
    StopAgentsForTask {
        task_id: String,
    },
    RegisterAgent {
        agent_id: String,
        role: String,
        #[serde(default)]
        pid: Option<u32>,
        #[serde(default)]
        task_id: Option<String>,
    },
    Heartbeat {
        agent_id: String,
    },
    PushEvent {
        agent_id: String,
        kind: String,
        data: Value,
    },
    ReadMessageHistory {
        agent_id: String,
    },
    ClaimFile {
        task_id: String,
        path: String,
    },
    ReleaseFile {
        task_id: String,
        path: String,
    },
    CheckBashCommand {
        command: String,
    },
    CheckActionAllowed {
        role: String,
        action: String,
    },
    StartTasks {
        count: usize,
    },
    Complain {
        task_id: String,
        files: Vec<String>,
        reason: String,
    },
    RevokeComplaint {
        task_id: String,
        #[serde(default)]
        files: Option<Vec<String>>,
    },
    ListActiveAgents,
    ListTaskAgents {
        task_id: String,
    },
    WaitForAgent {
        agent_id: String,
    },
    Broadcast {
        #[serde(default)]
        task_id: Option<String>,
        #[serde(default)]
        role: Option<String>,
        message: String,
        #[serde(default)]
        urgency: Option<String>,
    },
    InterruptAgent {
        task_id: String,
        #[serde(default)]
        message: Option<String>,
    },
    SteerAgent {
        agent_id: String,
        message: String,
    },
    AdvanceLifecycle {
        task_id: String,
        role: String,
        action: String,
        #[serde(default)]
        target: Option<String>,
    },
    TasksRequest {
        action: String,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        default_task_id: Option<String>,
    },
    FastWorkerCloseTask {
        task_id: String,
    },
    FastWorkerAdvanceLifecycle {
        task_id: String,
        action: String,
        #[serde(default)]
        target: Option<String>,
    },
    MergerComplete {
        task_id: String,
    },
    MergerConflict {
        task_id: String,
    },
    FinisherCloseTask {
        task_id: String,
    },
    IssuerAdvanceLifecycle {
        task_id: String,
        action: String,
        #[serde(default)]
        target: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemWire {
    pub temp_id: String,
    pub title: String,
    #[serde(default)]
    pub depends_on_temp_ids: Vec<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
}

/// The reply envelope (§4.4/§6): `{ok, error?, summary?, data?}`, with
/// `category` carried as an extra field for machine-readable error
/// dispatch beyond the base spec's minimal shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Response {
            ok: true,
            data: Some(data),
            ..Default::default()
        }
    }

    /// A bare acknowledgement with no payload, for verbs whose success
    /// carries no data of its own.
    pub fn ok_bare() -> Self {
        Response { ok: true, ..Default::default() }
    }

    pub fn from_error(err: &crate::error::DaemonError) -> Self {
        Response {
            ok: false,
            error: Some(err.to_string()),
            category: Some(err.category().to_string()),
            ..Default::default()
        }
    }

    /// Parses a response line, accepting the bare ASCII literal `ok` as
    /// `{ok:true}` for legacy senders (§4.4/§6, testable property 8).
    pub fn parse_line(line: &str) -> Result<Response, serde_json::Error> {
        if line.trim() == "ok" {
            return Ok(Response::ok_bare());
        }
        serde_json::from_str(line)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
