// SPDX-License-Identifier: MIT

//! The durable `Issue` and its supporting enums (§3 DATA MODEL).

use crate::id::{CommentId, IssueId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of issue. `Task` is the only type the [`crate::CoreError`]-free
/// scheduler admits; the rest are tracked the same way but carry different
/// semantics upstream (epics group tasks, `agent` issues mirror a live
/// registry entry, etc).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    #[default]
    Task,
    Bug,
    Feature,
    Epic,
    Group,
    Noop,
    Chore,
    Agent,
    Role,
    Rig,
    Convoy,
    Event,
    Slot,
    MergeRequest,
    Molecule,
    Gate,
}

impl IssueType {
    /// Default id prefix for freshly created issues of this type.
    pub fn id_prefix(&self) -> Option<&'static str> {
        match self {
            IssueType::Agent => Some("agent"),
            _ => None,
        }
    }

    /// The status values valid for issues of this type. Agent issues get the
    /// full agent lifecycle; everything else gets the plain task lifecycle.
    pub fn valid_statuses(&self) -> &'static [IssueStatus] {
        match self {
            IssueType::Agent => &[
                IssueStatus::Spawning,
                IssueStatus::Open,
                IssueStatus::InProgress,
                IssueStatus::Working,
                IssueStatus::Stuck,
                IssueStatus::Done,
                IssueStatus::Failed,
                IssueStatus::Aborted,
                IssueStatus::Stopped,
                IssueStatus::Dead,
                IssueStatus::Closed,
            ],
            _ => &[
                IssueStatus::Open,
                IssueStatus::InProgress,
                IssueStatus::Blocked,
                IssueStatus::Deferred,
                IssueStatus::Closed,
            ],
        }
    }

    pub fn is_valid_status(&self, status: IssueStatus) -> bool {
        self.valid_statuses().contains(&status)
    }
}

/// Status of an issue. The full set spans both the plain task lifecycle
/// (open/in_progress/blocked/deferred/closed) and the agent lifecycle
/// (spawning/.../done|failed|aborted|stopped|dead/closed); which subset is
/// legal for a given issue is determined by [`IssueType::valid_statuses`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Spawning,
    Open,
    InProgress,
    Working,
    Stuck,
    Blocked,
    Deferred,
    Done,
    Failed,
    Aborted,
    Stopped,
    Dead,
    Closed,
}

impl IssueStatus {
    /// Any status in {done, failed, aborted, stopped, dead, closed} per the
    /// GLOSSARY's "Terminal state" definition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IssueStatus::Done
                | IssueStatus::Failed
                | IssueStatus::Aborted
                | IssueStatus::Stopped
                | IssueStatus::Dead
                | IssueStatus::Closed
        )
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IssueStatus::Spawning => "spawning",
            IssueStatus::Open => "open",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::Working => "working",
            IssueStatus::Stuck => "stuck",
            IssueStatus::Blocked => "blocked",
            IssueStatus::Deferred => "deferred",
            IssueStatus::Done => "done",
            IssueStatus::Failed => "failed",
            IssueStatus::Aborted => "aborted",
            IssueStatus::Stopped => "stopped",
            IssueStatus::Dead => "dead",
            IssueStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Rough sizing hint for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Tiny,
    Small,
    Medium,
    Large,
    Xlarge,
}

/// Relationship a dependency edge represents. Only `Blocks` and
/// `ParentChild` (and the legacy "unspecified" case) gate scheduling;
/// anything else is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    Blocks,
    ParentChild,
    Informational,
}

impl DependencyKind {
    /// Whether a non-closed dependency of this kind blocks scheduling.
    pub fn is_blocking_kind(&self) -> bool {
        !matches!(self, DependencyKind::Informational)
    }
}

impl Default for DependencyKind {
    fn default() -> Self {
        DependencyKind::Blocks
    }
}

/// A cached dependency edge, denormalizing the dependency's status at the
/// time it was last observed. [`crate::TaskStore`]-level reads re-join this
/// with the dependency's live status; [`crate::TaskStore::close`] writes the
/// authoritative update directly into every dependent's cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub depends_on_id: IssueId,
    #[serde(default)]
    pub kind: DependencyKind,
    pub status: IssueStatus,
}

/// Aggregate token/cost usage, folded across every agent log bound to a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cost_usd: f64,
}

impl UsageTotals {
    pub fn add(&mut self, other: &UsageTotals) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cost_usd += other.cost_usd;
    }
}

/// `__agent_log` sub-object embedded on issues of type `agent`: the agent's
/// current task binding, usage, and slot bindings. Message bodies are never
/// persisted here (§3 "the in-process design intentionally does not persist
/// message bodies").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<String>,
    #[serde(default)]
    pub usage_totals: UsageTotals,
    #[serde(default)]
    pub slot_bindings: HashMap<String, IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
}

/// A comment on an issue. Append-only; ties are broken by `(id, created_at)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub issue_id: IssueId,
    pub author: String,
    pub text: String,
    pub created_at: String,
}

/// The durable unit of work tracked by the Task Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    pub status: IssueStatus,
    pub priority: u8,
    pub issue_type: IssueType,
    #[serde(default)]
    pub labels: IndexSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRecord>,
    #[serde(default)]
    pub references: Vec<IssueId>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "__agent_log")]
    pub agent_log: Option<AgentLog>,
}

impl Issue {
    /// The set of dependency ids, in insertion order, deduplicated.
    pub fn depends_on(&self) -> IndexSet<IssueId> {
        self.dependencies
            .iter()
            .map(|d| d.depends_on_id.clone())
            .collect()
    }

    pub fn has_dependency(&self, id: &str) -> bool {
        self.dependencies.iter().any(|d| d.depends_on_id == *id)
    }

    pub fn is_closed(&self) -> bool {
        self.status == IssueStatus::Closed
    }
}

#[cfg(test)]
#[path = "issue_tests.rs"]
mod tests;
