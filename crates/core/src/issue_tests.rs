// SPDX-License-Identifier: MIT

use super::*;

fn sample_issue() -> Issue {
    Issue {
        id: IssueId::new("fix-bug-aaaa"),
        title: "Fix the bug".into(),
        description: None,
        acceptance_criteria: None,
        status: IssueStatus::Open,
        priority: 2,
        issue_type: IssueType::Task,
        labels: IndexSet::new(),
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
fn task_type_rejects_agent_only_statuses() {
    assert!(!IssueType::Task.is_valid_status(IssueStatus::Spawning));
    assert!(IssueType::Task.is_valid_status(IssueStatus::Blocked));
}

#[test]
fn agent_type_rejects_task_only_statuses() {
    assert!(!IssueType::Agent.is_valid_status(IssueStatus::Blocked));
    assert!(IssueType::Agent.is_valid_status(IssueStatus::Stuck));
}

#[test]
fn terminal_statuses_cover_all_dead_ends() {
    for s in [
        IssueStatus::Done,
        IssueStatus::Failed,
        IssueStatus::Aborted,
        IssueStatus::Stopped,
        IssueStatus::Dead,
        IssueStatus::Closed,
    ] {
        assert!(s.is_terminal());
    }
    assert!(!IssueStatus::Open.is_terminal());
}

#[test]
fn depends_on_dedups_and_preserves_order() {
    let mut issue = sample_issue();
    issue.dependencies.push(DependencyRecord {
        depends_on_id: IssueId::new("a"),
        kind: DependencyKind::Blocks,
        status: IssueStatus::Open,
    });
    issue.dependencies.push(DependencyRecord {
        depends_on_id: IssueId::new("b"),
        kind: DependencyKind::ParentChild,
        status: IssueStatus::Closed,
    });
    let set = issue.depends_on();
    assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![IssueId::new("a"), IssueId::new("b")]);
    assert!(issue.has_dependency("a"));
    assert!(!issue.has_dependency("z"));
}

#[test]
fn informational_dependency_never_blocks() {
    assert!(!DependencyKind::Informational.is_blocking_kind());
    assert!(DependencyKind::Blocks.is_blocking_kind());
    assert!(DependencyKind::ParentChild.is_blocking_kind());
}

#[test]
fn usage_totals_accumulate() {
    let mut totals = UsageTotals::default();
    totals.add(&UsageTotals {
        input_tokens: 10,
        output_tokens: 5,
        cost_usd: 0.5,
    });
    totals.add(&UsageTotals {
        input_tokens: 3,
        output_tokens: 1,
        cost_usd: 0.25,
    });
    assert_eq!(totals.input_tokens, 13);
    assert_eq!(totals.output_tokens, 6);
    assert!((totals.cost_usd - 0.75).abs() < f64::EPSILON);
}
