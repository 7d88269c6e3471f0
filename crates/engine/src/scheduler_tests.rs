// SPDX-License-Identifier: MIT

use super::*;
use oms_core::{DependencyKind, DependencyRecord, IssueId};
use oms_registry::AgentStatus;

fn task(id: &str, priority: u8, status: IssueStatus) -> Issue {
    Issue {
        id: IssueId::new(id),
        title: id.to_string(),
        description: None,
        acceptance_criteria: None,
        status,
        priority,
        issue_type: IssueType::Task,
        labels: Default::default(),
        assignee: None,
        scope: None,
        created_at: "2024-01-01T00:00:00+00:00".into(),
        updated_at: "2024-01-01T00:00:00+00:00".into(),
        closed_at: None,
        comments: Vec::new(),
        dependencies: Vec::new(),
        references: Vec::new(),
        agent_log: None,
    }
}

#[test]
fn natural_cmp_orders_numeric_runs_numerically() {
    assert_eq!(natural_cmp("task-2", "task-10"), Ordering::Less);
    assert_eq!(natural_cmp("task-10", "task-2"), Ordering::Greater);
    assert_eq!(natural_cmp("task-2", "task-2"), Ordering::Equal);
    assert_eq!(natural_cmp("fix-bug-aaaa", "fix-bug-bbbb"), Ordering::Less);
}

#[test]
fn get_next_tasks_sorts_by_priority_then_natural_id() {
    let issues = vec![
        task("task-10", 1, IssueStatus::Open),
        task("task-2", 1, IssueStatus::Open),
        task("task-1", 0, IssueStatus::Open),
    ];
    let next = get_next_tasks(&issues, &[], 10);
    let ids: Vec<&str> = next.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["task-1", "task-2", "task-10"]);
}

#[test]
fn get_next_tasks_excludes_blocked_and_respects_limit() {
    let mut blocked = task("task-2", 0, IssueStatus::Open);
    blocked.dependencies.push(DependencyRecord {
        depends_on_id: IssueId::new("task-1"),
        kind: DependencyKind::Blocks,
        status: IssueStatus::Open,
    });
    let issues = vec![task("task-1", 0, IssueStatus::Open), blocked];
    let next = get_next_tasks(&issues, &[], 1);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].id, "task-1");
}

#[test]
fn find_tasks_unblocked_by_requires_all_deps_closed() {
    let mut dependent = task("task-2", 0, IssueStatus::Open);
    dependent.dependencies.push(DependencyRecord {
        depends_on_id: IssueId::new("task-1"),
        kind: DependencyKind::Blocks,
        status: IssueStatus::Closed,
    });
    dependent.dependencies.push(DependencyRecord {
        depends_on_id: IssueId::new("task-0"),
        kind: DependencyKind::Blocks,
        status: IssueStatus::Open,
    });
    let issues = vec![task("task-0", 0, IssueStatus::Open), dependent];
    let unblocked = find_tasks_unblocked_by(&issues, "task-1");
    assert!(unblocked.is_empty(), "task-0 dependency still open");
}

fn agent_entry(task_id: Option<&str>, active: bool) -> AgentRegistryEntry {
    AgentRegistryEntry {
        agent_id: oms_core::RegistryId::new("agent-1"),
        role: "worker".into(),
        pid: None,
        task_id: task_id.map(IssueId::new),
        status: if active {
            AgentStatus::Active
        } else {
            AgentStatus::Terminal { reason: "dead".into() }
        },
        registered_at_ms: 0,
        last_heartbeat_ms: 0,
    }
}

#[test]
fn in_progress_without_agent_excludes_actively_bound_tasks() {
    let issues = vec![task("task-1", 0, IssueStatus::InProgress), task("task-2", 0, IssueStatus::InProgress)];
    let agents = vec![agent_entry(Some("task-1"), true), agent_entry(Some("task-2"), false)];
    let orphaned = get_in_progress_tasks_without_agent(&issues, &agents);
    assert_eq!(orphaned.len(), 1);
    assert_eq!(orphaned[0].id, "task-2");
}

#[test]
fn try_claim_rejects_already_bound_task() {
    let issues = vec![task("task-1", 0, IssueStatus::Open)];
    let agents = vec![agent_entry(Some("task-1"), true)];
    let err = try_claim(&issues, &agents, "task-1", "agent-2").unwrap_err();
    assert!(matches!(err, EngineError::AlreadyClaimed(_)));
}

#[test]
fn label_conflicts_are_the_labels_held_by_in_progress_tasks() {
    let mut a = task("task-1", 0, IssueStatus::InProgress);
    a.labels.insert("module:ipc".to_string());
    let b = task("task-2", 0, IssueStatus::Open);
    let conflicts = compute_label_conflicts(&[a, b]);
    assert!(conflicts.contains("module:ipc"));
}

#[test]
fn get_next_tasks_rejects_a_candidate_sharing_a_label_with_an_in_progress_task() {
    let mut running = task("task-1", 0, IssueStatus::InProgress);
    running.labels.insert("module:ipc".to_string());
    let mut waiting = task("task-2", 0, IssueStatus::Open);
    waiting.labels.insert("module:ipc".to_string());
    let issues = vec![running, waiting];
    let next = get_next_tasks(&issues, &[], 5);
    assert!(next.is_empty(), "shared label with an in-progress task must reject the candidate");
}

#[test]
fn get_next_tasks_excludes_a_task_already_bound_to_an_active_agent() {
    let issues = vec![task("task-1", 0, IssueStatus::Open)];
    let agents = vec![agent_entry(Some("task-1"), true)];
    let next = get_next_tasks(&issues, &agents, 5);
    assert!(next.is_empty());
}
