// SPDX-License-Identifier: MIT

//! Pure scheduling decisions over a snapshot of issues and registered
//! agents (§4.3). Nothing here talks to the store or registry directly —
//! callers fetch a snapshot, call these functions, and apply the result.

use crate::error::EngineError;
use oms_core::{Issue, IssueStatus, IssueType};
use oms_registry::AgentRegistryEntry;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Digit-aware string comparison: runs of ASCII digits compare numerically,
/// everything else compares byte-wise. `task-2` sorts before `task-10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek(), bi.peek()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let na = take_number(&mut ai);
                    let nb = take_number(&mut bi);
                    match na.cmp(&nb) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                } else {
                    match x.cmp(y) {
                        Ordering::Equal => {
                            ai.next();
                            bi.next();
                            continue;
                        }
                        other => return other,
                    }
                }
            }
        }
    }
}

fn take_number(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> u128 {
    let mut digits = String::new();
    while let Some(c) = it.peek() {
        if c.is_ascii_digit() {
            digits.push(*c);
            it.next();
        } else {
            break;
        }
    }
    digits.parse().unwrap_or(0)
}

fn is_unblocked(issue: &Issue, issues_by_id: &HashMap<&str, &Issue>) -> bool {
    issue.dependencies.iter().all(|d| {
        !d.kind.is_blocking_kind()
            || issues_by_id
                .get(d.depends_on_id.as_str())
                .map(|dep| dep.is_closed())
                .unwrap_or(false)
    })
}

fn has_active_agent(task_id: &str, agents: &[AgentRegistryEntry]) -> bool {
    agents
        .iter()
        .any(|a| a.status.is_active() && a.task_id.as_ref().map(|t| t.as_str() == task_id).unwrap_or(false))
}

/// Ready, unclaimed `task`-typed issues with no active agent already bound
/// and no label in common with any `in_progress` task, sorted by priority
/// ascending then natural id, truncated to `limit` (§4.3 steps 1-5).
pub fn get_next_tasks(issues: &[Issue], agents: &[AgentRegistryEntry], limit: usize) -> Vec<Issue> {
    let by_id: HashMap<&str, &Issue> = issues.iter().map(|i| (i.id.as_str(), i)).collect();
    let conflict_labels = compute_label_conflicts(issues);
    let mut ready: Vec<&Issue> = issues
        .iter()
        .filter(|i| i.issue_type == IssueType::Task && i.status == IssueStatus::Open)
        .filter(|i| is_unblocked(i, &by_id))
        .filter(|i| !has_active_agent(i.id.as_str(), agents))
        .filter(|i| i.labels.iter().all(|l| !conflict_labels.contains(l.as_str())))
        .collect();
    ready.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| natural_cmp(a.id.as_str(), b.id.as_str())));
    ready.into_iter().take(limit).cloned().collect()
}

/// Tasks in `in_progress` with no currently active agent bound to them —
/// candidates for the lifecycle coordinator to respawn.
pub fn get_in_progress_tasks_without_agent(issues: &[Issue], agents: &[AgentRegistryEntry]) -> Vec<Issue> {
    issues
        .iter()
        .filter(|i| i.issue_type == IssueType::Task && i.status == IssueStatus::InProgress)
        .filter(|i| !has_active_agent(i.id.as_str(), agents))
        .cloned()
        .collect()
}

/// Checks whether `agent_id` may claim `task_id`: the task must exist, be
/// `open`, and have no other active agent already bound to it.
pub fn try_claim(issues: &[Issue], agents: &[AgentRegistryEntry], task_id: &str, _agent_id: &str) -> Result<Issue, EngineError> {
    let issue = issues
        .iter()
        .find(|i| i.id == task_id)
        .ok_or_else(|| EngineError::Store(oms_store::StoreError::NotFound(task_id.to_string())))?;
    if issue.status != IssueStatus::Open {
        return Err(EngineError::AlreadyClaimed(task_id.to_string()));
    }
    if has_active_agent(task_id, agents) {
        return Err(EngineError::AlreadyClaimed(task_id.to_string()));
    }
    Ok(issue.clone())
}

/// Open `task`-typed issues that depended (directly) on `closed_id` and now
/// have every blocking dependency closed.
pub fn find_tasks_unblocked_by(issues: &[Issue], closed_id: &str) -> Vec<Issue> {
    let by_id: HashMap<&str, &Issue> = issues.iter().map(|i| (i.id.as_str(), i)).collect();
    issues
        .iter()
        .filter(|i| i.issue_type == IssueType::Task && i.status == IssueStatus::Open)
        .filter(|i| i.has_dependency(closed_id))
        .filter(|i| is_unblocked(i, &by_id))
        .cloned()
        .collect()
}

/// The conflict label set (§4.3 step 4): every label held by a task
/// currently `in_progress`. A ready candidate sharing any of these labels
/// is rejected — two tasks touching the same area never run at once.
pub fn compute_label_conflicts(issues: &[Issue]) -> HashSet<String> {
    issues
        .iter()
        .filter(|i| i.issue_type == IssueType::Task && i.status == IssueStatus::InProgress)
        .flat_map(|i| i.labels.iter().cloned())
        .collect()
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
