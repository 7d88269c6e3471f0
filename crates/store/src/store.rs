// SPDX-License-Identifier: MIT

//! The Task Store (§4.1): one JSON file per issue, a shared index, and a
//! capped activity log. All mutations funnel through a single `tokio::sync`
//! mutex so that two concurrent callers can never interleave writes to the
//! same issue file — the same discipline the teacher's materialized state
//! uses for its WAL, adapted to a per-file contract instead of a log.

use crate::error::{StoreError, StoreResult};
use crate::layout::StoreLayout;
use crate::persist::{read_json, write_json_atomic};
use indexmap::{IndexMap, IndexSet};
use oms_core::slug::{self, HexSource};
use oms_core::{
    ActivityEvent, ActivityEventKind, Clock, Comment, CommentId, DependencyKind, DependencyRecord,
    Issue, IssueId, IssueStatus, IssueType, Scope,
};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone)]
pub struct CreateOpts {
    pub name: Option<String>,
    pub issue_type: IssueType,
    pub priority: u8,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    pub scope: Option<Scope>,
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub temp_id: String,
    pub title: String,
    pub depends_on_temp_ids: Vec<String>,
    pub opts: CreateOpts,
}

#[derive(Debug, Default, Clone)]
pub struct UpdatePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub acceptance_criteria: Option<String>,
    pub status: Option<IssueStatus>,
    pub priority: Option<u8>,
    pub add_labels: Vec<String>,
    pub assignee: Option<String>,
    pub scope: Option<Scope>,
}

#[derive(Debug, Default, Clone)]
pub struct QueryFilter {
    pub status: Option<IssueStatus>,
    pub issue_type: Option<IssueType>,
    pub label: Option<String>,
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted(IssueId),
    ClosedInstead(Issue),
}

struct Inner {
    issues: IndexMap<IssueId, Issue>,
    activity: VecDeque<ActivityEvent>,
    next_comment_seq: u64,
    next_activity_seq: u64,
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
struct IndexFile {
    #[serde(default)]
    ids: Vec<String>,
    #[serde(default)]
    next_comment_seq: u64,
    #[serde(default)]
    next_activity_seq: u64,
}

struct HexFn(Box<dyn Fn(usize) -> String + Send + Sync>);

impl HexSource for HexFn {
    fn hex(&self, chars: usize) -> String {
        (self.0)(chars)
    }
}

pub struct TaskStore {
    layout: StoreLayout,
    clock: Arc<dyn Clock>,
    hex_source: HexFn,
    max_activity_log: usize,
    inner: Mutex<Inner>,
}

fn default_hex(chars: usize) -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(chars).collect()
}

impl TaskStore {
    pub fn open(root: impl Into<std::path::PathBuf>) -> StoreResult<Self> {
        Self::open_with(root, Arc::new(oms_core::SystemClock), 5000)
    }

    pub fn open_with(
        root: impl Into<std::path::PathBuf>,
        clock: Arc<dyn Clock>,
        max_activity_log: usize,
    ) -> StoreResult<Self> {
        let layout = StoreLayout::new(root.into());
        let inner = load(&layout)?;
        Ok(Self {
            layout,
            clock,
            hex_source: HexFn(Box::new(default_hex)),
            max_activity_log,
            inner: Mutex::new(inner),
        })
    }

    /// Override the hex-suffix source, for deterministic id tests.
    pub fn with_hex_source(mut self, hex: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        self.hex_source = HexFn(Box::new(hex));
        self
    }

    fn now(&self) -> String {
        self.clock.now_iso8601()
    }

    async fn record_activity(&self, inner: &mut Inner, issue_id: Option<IssueId>, kind: ActivityEventKind, actor: &str) -> StoreResult<()> {
        inner.next_activity_seq += 1;
        let event = ActivityEvent {
            id: oms_core::ActivityId::new(format!("act-{}", inner.next_activity_seq)),
            issue_id,
            kind,
            actor: actor.to_string(),
            created_at: self.now(),
            data: None,
        };
        inner.activity.push_back(event);
        while inner.activity.len() > self.max_activity_log {
            inner.activity.pop_front();
        }
        self.persist_activity(inner)
    }

    fn persist_issue(&self, issue: &Issue) -> StoreResult<()> {
        write_json_atomic(&self.layout.issue_file(issue.id.as_str()), &self.layout.issue_tmp_file(issue.id.as_str()), issue)?;
        Ok(())
    }

    fn delete_issue_file(&self, id: &str) -> StoreResult<()> {
        let path = self.layout.issue_file(id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn persist_activity(&self, inner: &Inner) -> StoreResult<()> {
        let events: Vec<&ActivityEvent> = inner.activity.iter().collect();
        write_json_atomic(&self.layout.activity_file(), &self.layout.activity_tmp_file(), &events)?;
        Ok(())
    }

    fn persist_index(&self, inner: &Inner) -> StoreResult<()> {
        let file = IndexFile {
            ids: inner.issues.keys().map(|id| id.as_str().to_string()).collect(),
            next_comment_seq: inner.next_comment_seq,
            next_activity_seq: inner.next_activity_seq,
        };
        write_json_atomic(&self.layout.index_file(), &self.layout.index_tmp_file(), &file)?;
        Ok(())
    }

    pub async fn list(&self) -> Vec<Issue> {
        self.inner.lock().await.issues.values().cloned().collect()
    }

    pub async fn show(&self, id: &str) -> StoreResult<Issue> {
        self.inner
            .lock()
            .await
            .issues
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub async fn ready(&self) -> Vec<Issue> {
        let inner = self.inner.lock().await;
        inner
            .issues
            .values()
            .filter(|issue| {
                issue.issue_type == IssueType::Task
                    && issue.status == IssueStatus::Open
                    && issue.dependencies.iter().all(|d| {
                        !d.kind.is_blocking_kind()
                            || inner
                                .issues
                                .get(&d.depends_on_id)
                                .map(|dep| dep.is_closed())
                                .unwrap_or(false)
                    })
            })
            .cloned()
            .collect()
    }

    pub async fn query(&self, filter: &QueryFilter) -> Vec<Issue> {
        self.inner
            .lock()
            .await
            .issues
            .values()
            .filter(|issue| filter.status.map(|s| issue.status == s).unwrap_or(true))
            .filter(|issue| filter.issue_type.map(|t| issue.issue_type == t).unwrap_or(true))
            .filter(|issue| {
                filter
                    .label
                    .as_ref()
                    .map(|l| issue.labels.contains(l))
                    .unwrap_or(true)
            })
            .filter(|issue| {
                filter
                    .assignee
                    .as_ref()
                    .map(|a| issue.assignee.as_deref() == Some(a.as_str()))
                    .unwrap_or(true)
            })
            .cloned()
            .collect()
    }

    pub async fn search(&self, text: &str) -> Vec<Issue> {
        let needle = text.to_lowercase();
        self.inner
            .lock()
            .await
            .issues
            .values()
            .filter(|issue| {
                issue.title.to_lowercase().contains(&needle)
                    || issue
                        .description
                        .as_ref()
                        .map(|d| d.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    pub async fn activity(&self, since: Option<&str>) -> Vec<ActivityEvent> {
        let inner = self.inner.lock().await;
        match since {
            Some(since) => inner
                .activity
                .iter()
                .filter(|e| e.created_at.as_str() > since)
                .cloned()
                .collect(),
            None => inner.activity.iter().cloned().collect(),
        }
    }

    pub async fn create(&self, title: &str, actor: &str, opts: CreateOpts) -> StoreResult<Issue> {
        if title.trim().is_empty() {
            return Err(oms_core::CoreError::EmptyTitle.into());
        }
        let mut inner = self.inner.lock().await;
        let dependencies = self.resolve_dependencies(&inner, &opts.depends_on)?;
        let mut issue = self.build_issue(&mut inner, title, &opts)?;
        issue.dependencies = dependencies;
        inner.issues.insert(issue.id.clone(), issue.clone());
        self.persist_issue(&issue)?;
        self.persist_index(&inner)?;
        self.record_activity(&mut inner, Some(issue.id.clone()), ActivityEventKind::Create, actor).await?;
        Ok(issue)
    }

    /// Resolves and de-duplicates `depends_on` ids against the live issue
    /// set. Fails before any mutation if one does not resolve, so a bad
    /// dependency id leaves no trace (§4.1 atomic create).
    fn resolve_dependencies(&self, inner: &Inner, depends_on: &[String]) -> StoreResult<Vec<DependencyRecord>> {
        let mut seen: IndexSet<String> = IndexSet::new();
        let mut records = Vec::new();
        for dep_id in depends_on {
            if !seen.insert(dep_id.clone()) {
                continue;
            }
            let dep = inner
                .issues
                .get(dep_id.as_str())
                .ok_or_else(|| oms_core::CoreError::UnknownDependency(dep_id.clone()))?;
            records.push(DependencyRecord {
                depends_on_id: dep.id.clone(),
                kind: DependencyKind::Blocks,
                status: dep.status,
            });
        }
        Ok(records)
    }

    fn build_issue(&self, inner: &mut Inner, title: &str, opts: &CreateOpts) -> StoreResult<Issue> {
        let now_ms = self.clock.epoch_ms();
        let exists = |candidate: &str| inner.issues.contains_key(candidate);
        let id_str = if opts.issue_type == IssueType::Agent {
            slug::derive_agent_id(opts.name.as_deref(), title, now_ms, &self.hex_source, exists)
        } else {
            slug::derive_id(opts.name.as_deref(), title, now_ms, &self.hex_source, exists)
        };
        let now = self.now();
        let status = if opts.issue_type == IssueType::Agent {
            IssueStatus::Spawning
        } else {
            IssueStatus::Open
        };
        let agent_log = if opts.issue_type == IssueType::Agent {
            Some(oms_core::AgentLog::default())
        } else {
            None
        };
        Ok(Issue {
            id: IssueId::new(id_str),
            title: title.to_string(),
            description: opts.description.clone(),
            acceptance_criteria: opts.acceptance_criteria.clone(),
            status,
            priority: opts.priority,
            issue_type: opts.issue_type,
            labels: opts.labels.iter().cloned().collect::<IndexSet<_>>(),
            assignee: opts.assignee.clone(),
            scope: opts.scope,
            created_at: now.clone(),
            updated_at: now,
            closed_at: None,
            comments: Vec::new(),
            dependencies: Vec::new(),
            references: Vec::new(),
            agent_log,
        })
    }

    pub async fn create_batch(&self, items: Vec<BatchItem>, actor: &str) -> StoreResult<Vec<Issue>> {
        if items.is_empty() {
            return Err(oms_core::CoreError::EmptyBatch.into());
        }
        let order = topo_sort(&items)?;
        let mut inner = self.inner.lock().await;
        let mut temp_to_real: std::collections::HashMap<String, IssueId> = std::collections::HashMap::new();
        let mut created = Vec::with_capacity(items.len());
        for idx in order {
            let item = &items[idx];
            let mut issue = self.build_issue(&mut inner, &item.title, &item.opts)?;
            for temp_dep in &item.depends_on_temp_ids {
                let real_id = temp_to_real
                    .get(temp_dep)
                    .cloned()
                    .ok_or_else(|| StoreError::from(oms_core::CoreError::UnknownDependency(temp_dep.clone())))?;
                issue.dependencies.push(DependencyRecord {
                    depends_on_id: real_id,
                    kind: DependencyKind::Blocks,
                    status: IssueStatus::Open,
                });
            }
            temp_to_real.insert(item.temp_id.clone(), issue.id.clone());
            inner.issues.insert(issue.id.clone(), issue.clone());
            self.persist_issue(&issue)?;
            created.push(issue);
        }
        self.persist_index(&inner)?;
        self.record_activity(&mut inner, None, ActivityEventKind::CreateBatch, actor).await?;
        Ok(created)
    }

    pub async fn update(&self, id: &str, actor: &str, patch: UpdatePatch) -> StoreResult<Issue> {
        let mut inner = self.inner.lock().await;
        let issue = inner
            .issues
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if issue.is_closed() {
            return Err(StoreError::ClosedIssue(id.to_string()));
        }
        if let Some(status) = patch.status {
            if !issue.issue_type.is_valid_status(status) {
                return Err(oms_core::CoreError::InvalidStatus {
                    status: status.to_string(),
                    issue_type: format!("{:?}", issue.issue_type),
                }
                .into());
            }
            issue.status = status;
        }
        if let Some(title) = patch.title {
            issue.title = title;
        }
        if patch.description.is_some() {
            issue.description = patch.description;
        }
        if patch.acceptance_criteria.is_some() {
            issue.acceptance_criteria = patch.acceptance_criteria;
        }
        if let Some(priority) = patch.priority {
            issue.priority = priority;
        }
        for label in patch.add_labels {
            issue.labels.insert(label);
        }
        if patch.assignee.is_some() {
            issue.assignee = patch.assignee;
        }
        if patch.scope.is_some() {
            issue.scope = patch.scope;
        }
        issue.updated_at = self.now();
        let snapshot = issue.clone();
        self.persist_issue(&snapshot)?;
        self.record_activity(&mut inner, Some(snapshot.id.clone()), ActivityEventKind::Update, actor).await?;
        Ok(snapshot)
    }

    pub async fn close(&self, id: &str, actor: &str, reason: Option<String>) -> StoreResult<Issue> {
        let mut inner = self.inner.lock().await;
        let now = self.now();
        {
            let issue = inner
                .issues
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            if issue.is_closed() {
                return Err(StoreError::ClosedIssue(id.to_string()));
            }
            issue.status = IssueStatus::Closed;
            issue.closed_at = Some(now.clone());
            issue.updated_at = now.clone();
            if let (Some(reason), Some(log)) = (reason, issue.agent_log.as_mut()) {
                log.close_reason = Some(reason);
            }
        }
        let snapshot = inner.issues.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?.clone();
        self.persist_issue(&snapshot)?;

        let dependent_ids: Vec<IssueId> = inner
            .issues
            .values()
            .filter(|dependent| dependent.has_dependency(id))
            .map(|dependent| dependent.id.clone())
            .collect();
        for dep_id in dependent_ids {
            if let Some(dependent) = inner.issues.get_mut(&dep_id) {
                for record in dependent.dependencies.iter_mut() {
                    if record.depends_on_id == *id {
                        record.status = IssueStatus::Closed;
                    }
                }
                let persisted = dependent.clone();
                self.persist_issue(&persisted)?;
            }
        }
        self.record_activity(&mut inner, Some(snapshot.id.clone()), ActivityEventKind::Close, actor).await?;
        Ok(snapshot)
    }

    pub async fn comment(&self, id: &str, author: &str, text: &str) -> StoreResult<Comment> {
        let mut inner = self.inner.lock().await;
        inner.next_comment_seq += 1;
        let comment = Comment {
            id: CommentId::new(format!("c-{}", inner.next_comment_seq)),
            issue_id: IssueId::new(id),
            author: author.to_string(),
            text: text.to_string(),
            created_at: self.now(),
        };
        let issue = inner
            .issues
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        issue.comments.push(comment.clone());
        issue.updated_at = self.now();
        let snapshot = issue.clone();
        self.persist_issue(&snapshot)?;
        self.persist_index(&inner)?;
        self.record_activity(&mut inner, Some(IssueId::new(id)), ActivityEventKind::CommentAdd, author).await?;
        Ok(comment)
    }

    pub async fn dep_add(&self, id: &str, depends_on: &str, kind: DependencyKind, actor: &str) -> StoreResult<()> {
        if id == depends_on {
            return Err(oms_core::CoreError::SelfDependency(id.to_string()).into());
        }
        let mut inner = self.inner.lock().await;
        if !inner.issues.contains_key(depends_on) {
            return Err(oms_core::CoreError::UnknownDependency(depends_on.to_string()).into());
        }
        if reaches(&inner.issues, depends_on, id) {
            return Err(oms_core::CoreError::CycleDetected(format!("{id} -> {depends_on}")).into());
        }
        let dep_status = inner
            .issues
            .get(depends_on)
            .ok_or_else(|| StoreError::NotFound(depends_on.to_string()))?
            .status;
        let issue = inner
            .issues
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        issue.dependencies.push(DependencyRecord {
            depends_on_id: IssueId::new(depends_on),
            kind,
            status: dep_status,
        });
        issue.updated_at = self.now();
        let snapshot = issue.clone();
        self.persist_issue(&snapshot)?;
        self.record_activity(&mut inner, Some(snapshot.id.clone()), ActivityEventKind::DepAdd, actor).await?;
        Ok(())
    }

    pub async fn dep_tree(&self, id: &str) -> StoreResult<Vec<Issue>> {
        let inner = self.inner.lock().await;
        if !inner.issues.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let mut seen = IndexSet::new();
        let mut stack = vec![id.to_string()];
        let mut out = Vec::new();
        while let Some(current) = stack.pop() {
            let Some(issue) = inner.issues.get(current.as_str()) else {
                continue;
            };
            for dep in &issue.dependencies {
                if seen.insert(dep.depends_on_id.as_str().to_string()) {
                    if let Some(dep_issue) = inner.issues.get(dep.depends_on_id.as_str()) {
                        out.push(dep_issue.clone());
                        stack.push(dep.depends_on_id.as_str().to_string());
                    }
                }
            }
        }
        Ok(out)
    }

    pub async fn delete(&self, id: &str, actor: &str) -> StoreResult<DeleteOutcome> {
        let mut inner = self.inner.lock().await;
        if !inner.issues.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let has_dependents = inner.issues.values().any(|i| i.has_dependency(id));
        if has_dependents {
            drop(inner);
            let closed = self.close(id, actor, Some("deleted with dependents; closed instead".into())).await?;
            return Ok(DeleteOutcome::ClosedInstead(closed));
        }
        inner.issues.shift_remove(id);
        self.delete_issue_file(id)?;
        self.persist_index(&inner)?;
        self.record_activity(&mut inner, Some(IssueId::new(id)), ActivityEventKind::Delete, actor).await?;
        Ok(DeleteOutcome::Deleted(IssueId::new(id)))
    }

    pub async fn set_agent_log(&self, id: &str, log: oms_core::AgentLog) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let issue = inner
            .issues
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        issue.agent_log = Some(log);
        issue.updated_at = self.now();
        let snapshot = issue.clone();
        self.persist_issue(&snapshot)?;
        Ok(())
    }
}

/// True if `target` is reachable from `from` by following dependency edges —
/// used to detect whether adding `from -> target` (meaning `from` depends on
/// `target`) would close a cycle, i.e. whether `target` already (transitively)
/// depends on `from`.
fn reaches(issues: &IndexMap<IssueId, Issue>, from: &str, target: &str) -> bool {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![from.to_string()];
    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(issue) = issues.get(current.as_str()) {
            for dep in &issue.dependencies {
                stack.push(dep.depends_on_id.as_str().to_string());
            }
        }
    }
    false
}

/// Kahn's algorithm over the batch's temp-id dependency graph. Returns the
/// item indices in an order where every dependency precedes its dependent,
/// or a `CycleDetected`-flavored error if the batch isn't a DAG.
fn topo_sort(items: &[BatchItem]) -> StoreResult<Vec<usize>> {
    let index_of: std::collections::HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.temp_id.as_str(), i))
        .collect();
    let mut in_degree = vec![0usize; items.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); items.len()];
    for (i, item) in items.iter().enumerate() {
        for dep in &item.depends_on_temp_ids {
            let dep_idx = *index_of
                .get(dep.as_str())
                .ok_or_else(|| StoreError::from(oms_core::CoreError::UnknownDependency(dep.clone())))?;
            dependents[dep_idx].push(i);
            in_degree[i] += 1;
        }
    }
    let mut queue: VecDeque<usize> = (0..items.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(items.len());
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for &dep in &dependents[i] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                queue.push_back(dep);
            }
        }
    }
    if order.len() != items.len() {
        return Err(oms_core::CoreError::CycleDetected("batch contains a dependency cycle".into()).into());
    }
    Ok(order)
}

fn load(layout: &StoreLayout) -> StoreResult<Inner> {
    std::fs::create_dir_all(layout.tasks_dir())?;
    migrate_legacy(layout)?;

    let mut issues: IndexMap<IssueId, Issue> = IndexMap::new();
    let mut entries: Vec<_> = std::fs::read_dir(layout.tasks_dir())?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        if let Some(issue) = read_json::<Issue>(&entry.path())? {
            issues.insert(issue.id.clone(), issue);
        }
    }

    let activity: VecDeque<ActivityEvent> = read_json::<Vec<ActivityEvent>>(&layout.activity_file())?
        .unwrap_or_default()
        .into();

    let index = read_json::<IndexFile>(&layout.index_file())?.unwrap_or_default();
    let next_comment_seq = index.next_comment_seq;
    let next_activity_seq = index.next_activity_seq.max(activity.len() as u64);

    Ok(Inner {
        issues,
        activity,
        next_comment_seq,
        next_activity_seq,
    })
}

fn migrate_legacy(layout: &StoreLayout) -> StoreResult<()> {
    let legacy = layout.legacy_tasks_file();
    if !legacy.exists() {
        return Ok(());
    }
    if let Some(issues) = read_json::<Vec<Issue>>(&legacy)? {
        for issue in &issues {
            write_json_atomic(&layout.issue_file(issue.id.as_str()), &layout.issue_tmp_file(issue.id.as_str()), issue)?;
        }
    }
    std::fs::rename(&legacy, layout.legacy_tasks_migrated_file())?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
