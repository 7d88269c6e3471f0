// SPDX-License-Identifier: MIT

//! Append-only activity log entries (§3 DATA MODEL, §4.1 `activity`).

use crate::id::{ActivityId, IssueId};
use serde::{Deserialize, Serialize};

/// The kind of activity recorded. Every store mutation that is visible to
/// `query`/`activity` appends exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEventKind {
    Create,
    CreateBatch,
    Update,
    Close,
    Delete,
    CommentAdd,
    DepAdd,
    LabelAdd,
    AgentState,
    SlotSet,
    SlotClear,
}

impl std::fmt::Display for ActivityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityEventKind::Create => "create",
            ActivityEventKind::CreateBatch => "create_batch",
            ActivityEventKind::Update => "update",
            ActivityEventKind::Close => "close",
            ActivityEventKind::Delete => "delete",
            ActivityEventKind::CommentAdd => "comment_add",
            ActivityEventKind::DepAdd => "dep_add",
            ActivityEventKind::LabelAdd => "label_add",
            ActivityEventKind::AgentState => "agent_state",
            ActivityEventKind::SlotSet => "slot_set",
            ActivityEventKind::SlotClear => "slot_clear",
        };
        write!(f, "{s}")
    }
}

/// A single entry in `_activity.json`, capped at `OMS_MAX_ACTIVITY_LOG`
/// entries (oldest evicted first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: ActivityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<IssueId>,
    pub kind: ActivityEventKind,
    pub actor: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
