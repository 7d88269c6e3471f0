// SPDX-License-Identifier: MIT

//! Accepts connections on the daemon's Unix socket and dispatches each
//! newline-delimited request to the shared [`DaemonState`] (§4.4). One task
//! per connection; a connection serves exactly one request/response pair,
//! matching the orchestrator's call-and-disconnect client.

use crate::error::DaemonError;
use crate::protocol::{BatchItemWire, Request, Response};
use crate::state::DaemonState;
use oms_core::{AgentLog, DependencyKind, Issue, IssueStatus, IssueType};
use oms_engine::Signal;
use oms_store::{BatchItem, CreateOpts, QueryFilter, UpdatePatch};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

pub struct Listener {
    socket: UnixListener,
    state: Arc<DaemonState>,
}

impl Listener {
    pub fn bind(state: Arc<DaemonState>) -> std::io::Result<Self> {
        let path = &state.config.socket_path;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let socket = UnixListener::bind(path)?;
        Ok(Self { socket, state })
    }

    /// Accepts connections until `shutdown` resolves, spawning one task per
    /// connection. Errors handling an individual connection are logged, not
    /// propagated — a single bad client must not take the daemon down.
    pub async fn run(self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                accepted = self.socket.accept() => {
                    match accepted {
                        Ok((stream, _addr)) => {
                            let state = Arc::clone(&self.state);
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, &state).await {
                                    tracing::warn!(error = %e, "connection handling failed");
                                }
                            });
                        }
                        Err(e) => tracing::error!(error = %e, "accept failed"),
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("listener shutting down");
                    break;
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, state: &DaemonState) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                tracing::debug!(request = ?request, "received request");
                dispatch(request, state).await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "request failed");
                    Response::from_error(&e)
                })
            }
            Err(e) => Response::from_error(&DaemonError::BadRequest(e.to_string())),
        };
        let mut out = serde_json::to_vec(&response).unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to serialize response");
            br#"{"ok":false,"error":"internal serialization failure","category":"internal"}"#.to_vec()
        });
        out.push(b'\n');
        writer.write_all(&out).await?;
    }
    Ok(())
}

fn parse_enum<T: DeserializeOwned>(field: &'static str, raw: &str) -> Result<T, DaemonError> {
    serde_json::from_value(Value::String(raw.to_string())).map_err(|_| DaemonError::InvalidEnv {
        name: field.to_string(),
        value: raw.to_string(),
    })
}

fn issues_to_value(issues: Vec<Issue>) -> Value {
    json!({ "issues": issues })
}

/// Serializes a known-serializable value to JSON, falling back to a null
/// sentinel with a logged error on the astronomically unlikely failure
/// (e.g. a `NaN` cost_usd) rather than panicking the connection task.
fn to_value(value: impl serde::Serialize) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize response payload");
        Value::Null
    })
}

async fn dispatch(request: Request, state: &DaemonState) -> Result<Response, DaemonError> {
    check_permission(&request, state)?;
    let data = match request {
        Request::Ready => issues_to_value(state.store.ready().await),
        Request::List => issues_to_value(state.store.list().await),
        Request::Show { id } => to_value(state.store.show(&id).await?),
        Request::Create {
            title,
            name,
            issue_type,
            priority,
            description,
            acceptance_criteria,
            labels,
            assignee,
            scope,
            depends_on,
        } => {
            let opts = CreateOpts {
                name,
                issue_type: issue_type.as_deref().map(|s| parse_enum("issue_type", s)).transpose()?.unwrap_or_default(),
                priority: priority.unwrap_or(2),
                description,
                acceptance_criteria,
                labels: labels.unwrap_or_default(),
                assignee,
                scope: scope.as_deref().map(|s| parse_enum("scope", s)).transpose()?,
                depends_on: depends_on.unwrap_or_default(),
            };
            let issue = state.store.create(&title, &state.config.actor, opts).await?;
            to_value(issue)
        }
        Request::CreateBatch { items } => {
            let items = items
                .into_iter()
                .map(|w: BatchItemWire| -> Result<BatchItem, DaemonError> {
                    Ok(BatchItem {
                        temp_id: w.temp_id,
                        title: w.title,
                        depends_on_temp_ids: w.depends_on_temp_ids,
                        opts: CreateOpts {
                            issue_type: w.issue_type.as_deref().map(|s| parse_enum("issue_type", s)).transpose()?.unwrap_or_default(),
                            priority: w.priority.unwrap_or(2),
                            ..Default::default()
                        },
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            issues_to_value(state.store.create_batch(items, &state.config.actor).await?)
        }
        Request::Update {
            id,
            title,
            description,
            acceptance_criteria,
            status,
            priority,
            add_labels,
            assignee,
            scope,
        } => {
            let patch = UpdatePatch {
                title,
                description,
                acceptance_criteria,
                status: status.as_deref().map(|s| parse_enum("status", s)).transpose()?,
                priority,
                add_labels: add_labels.unwrap_or_default(),
                assignee,
                scope: scope.as_deref().map(|s| parse_enum("scope", s)).transpose()?,
            };
            to_value(state.store.update(&id, &state.config.actor, patch).await?)
        }
        Request::Close { id } => to_value(state.store.close(&id, &state.config.actor, None).await?),
        Request::Comment { id, author, text } => {
            if let Err(rejection) = state.verifier.check_comment(&author, &text).await {
                return Err(oms_engine::EngineError::CompletionRejected(rejection.reason()).into());
            }
            to_value(state.store.comment(&id, &author, &text).await?)
        }
        Request::DepAdd { id, depends_on, kind } => {
            let kind: DependencyKind = kind.as_deref().map(|s| parse_enum("kind", s)).transpose()?.unwrap_or_default();
            state.store.dep_add(&id, &depends_on, kind, &state.config.actor).await?;
            json!({ "ok": true })
        }
        Request::DepTree { id } => issues_to_value(state.store.dep_tree(&id).await?),
        Request::Search { query } => issues_to_value(state.store.search(&query).await),
        Request::Query {
            status,
            issue_type,
            label,
            assignee,
        } => {
            let filter = QueryFilter {
                status: status.as_deref().map(|s| parse_enum::<IssueStatus>("status", s)).transpose()?,
                issue_type: issue_type.as_deref().map(|s| parse_enum::<IssueType>("issue_type", s)).transpose()?,
                label,
                assignee,
            };
            issues_to_value(state.store.query(&filter).await)
        }
        Request::Delete { id } => to_value(state.store.delete(&id, &state.config.actor).await?),
        Request::Activity => {
            let events = state.store.activity(None).await;
            json!({ "events": events })
        }
        Request::SetAgentLog { id, task_id, close_reason } => {
            let log = AgentLog {
                task_id: task_id.map(Into::into),
                close_reason,
                ..Default::default()
            };
            state.store.set_agent_log(&id, log).await?;
            json!({ "ok": true })
        }
        Request::ClaimAndSpawn { task_id, agent_kind, role } => {
            let agent_id = state
                .lifecycle
                .claim_and_spawn(&task_id, &agent_kind, &role, &state.config.actor)
                .await?;
            state.verifier.start_agent(agent_id.as_str()).await.map_err(DaemonError::Io)?;
            json!({ "agentId": agent_id.as_str() })
        }
        Request::ReplaceAgent { task_id, agent_kind, role } => {
            let agent_id = state.lifecycle.replace_agent(&task_id, &agent_kind, &role).await?;
            state.verifier.start_agent(agent_id.as_str()).await.map_err(DaemonError::Io)?;
            json!({ "agentId": agent_id.as_str() })
        }
        Request::StopAgentsForTask { task_id } => {
            let agents = state.registry.get_all();
            for agent in agents.iter().filter(|a| a.task_id.as_ref().map(|t| t.as_str() == task_id.as_str()).unwrap_or(false)) {
                state.verifier.forget_agent(agent.agent_id.as_str());
            }
            state.lifecycle.stop_agents_for_task(&task_id, Signal::Terminate).await?;
            json!({ "ok": true })
        }
        Request::RegisterAgent { agent_id, role, pid, task_id } => {
            let registry_id: oms_core::RegistryId = agent_id.clone().into();
            state
                .registry
                .register(registry_id, &role, pid, task_id.map(Into::into))
                .map_err(oms_engine::EngineError::Registry)?;
            state.verifier.start_agent(&agent_id).await.map_err(DaemonError::Io)?;
            json!({ "ok": true })
        }
        Request::Heartbeat { agent_id } => {
            let revived = state.registry.heartbeat(&agent_id).map_err(oms_engine::EngineError::Registry)?;
            json!({ "ok": true, "revived": revived })
        }
        Request::PushEvent { agent_id, kind, data } => {
            if matches!(kind.as_str(), "edit" | "write") {
                if let Some(path) = data.get("path").and_then(Value::as_str) {
                    state.verifier.record_write_intent(&agent_id, std::path::PathBuf::from(path));
                }
            }
            state
                .registry
                .push_event(&agent_id, &kind, data)
                .map_err(oms_engine::EngineError::Registry)?;
            json!({ "ok": true })
        }
        Request::ReadMessageHistory { agent_id } => {
            json!({ "messages": state.registry.read_message_history(&agent_id) })
        }
        Request::ClaimFile { task_id, path } => {
            state.conflicts.claim_file(&path, &task_id)?;
            json!({ "ok": true })
        }
        Request::ReleaseFile { task_id, path } => {
            state.conflicts.release_file(&path, &task_id);
            json!({ "ok": true })
        }
        Request::CheckBashCommand { command } => {
            let verdict = oms_engine::classify_bash_command(&command);
            match verdict {
                oms_engine::BashVerdict::Allowed => json!({ "allowed": true }),
                oms_engine::BashVerdict::Blocked(reason) => json!({ "allowed": false, "reason": reason }),
            }
        }
        Request::CheckActionAllowed { role, action } => {
            json!({ "allowed": oms_engine::is_action_allowed(&role, &action) })
        }
        Request::StartTasks { count } => {
            let issues = state.store.list().await;
            let agents = state.registry.get_all();
            let candidates = oms_engine::get_next_tasks(&issues, &agents, count);
            let mut task_ids = Vec::with_capacity(candidates.len());
            for issue in candidates {
                task_ids.push(issue.id.as_str().to_string());
            }
            json!({ "spawned": task_ids.len(), "taskIds": task_ids })
        }
        Request::Complain { task_id, files, reason } => {
            for file in &files {
                state.conflicts.complain(file, &task_id, &reason)?;
            }
            json!({ "ok": true })
        }
        Request::RevokeComplaint { task_id, files } => {
            match files {
                Some(files) => {
                    for file in &files {
                        state.conflicts.revoke_complaint(file, &task_id);
                    }
                }
                None => state.conflicts.revoke_all(&task_id),
            }
            json!({ "ok": true })
        }
        Request::ListActiveAgents => json!({ "agents": state.registry.get_active() }),
        Request::ListTaskAgents { task_id } => {
            let agents: Vec<_> = state
                .registry
                .get_all()
                .into_iter()
                .filter(|a| a.task_id.as_ref().map(|t| t.as_str() == task_id.as_str()).unwrap_or(false))
                .collect();
            json!({ "agents": agents })
        }
        Request::WaitForAgent { agent_id } => {
            wait_for_agent_inactive(&state.registry, &agent_id).await;
            json!({ "ok": true })
        }
        Request::Broadcast { task_id, role, message, urgency } => {
            let recipients: Vec<_> = state
                .registry
                .get_active()
                .into_iter()
                .filter(|a| task_id.as_deref().map(|t| a.task_id.as_ref().map(|at| at.as_str() == t).unwrap_or(false)).unwrap_or(true))
                .filter(|a| role.as_deref().map(|r| a.role == r).unwrap_or(true))
                .collect();
            for agent in &recipients {
                let payload = json!({ "message": message, "urgency": urgency.as_deref().unwrap_or("normal") });
                state
                    .registry
                    .push_event(agent.agent_id.as_str(), "broadcast", payload)
                    .map_err(oms_engine::EngineError::Registry)?;
            }
            json!({ "delivered": recipients.len() })
        }
        Request::InterruptAgent { task_id, message } => {
            let agents = state.registry.get_all();
            for agent in agents.iter().filter(|a| a.task_id.as_ref().map(|t| t.as_str() == task_id.as_str()).unwrap_or(false)) {
                state.verifier.forget_agent(agent.agent_id.as_str());
            }
            state.lifecycle.stop_agents_for_task(&task_id, Signal::Terminate).await?;
            if let Some(message) = message {
                tracing::warn!(task_id = %task_id, message = %message, "queued message dropped: no pending kickoff channel for next spawn");
            }
            json!({ "ok": true })
        }
        Request::SteerAgent { agent_id, message } => {
            state
                .registry
                .push_event(&agent_id, "steer", json!({ "message": message }))
                .map_err(oms_engine::EngineError::Registry)?;
            json!({ "ok": true })
        }
        Request::AdvanceLifecycle { task_id, role, action, target } => {
            let stage = state
                .lifecycle
                .advance_lifecycle(&task_id, &role, &action, target.as_deref(), &state.config.actor)
                .await?;
            json!({ "ok": true, "stage": stage })
        }
        Request::TasksRequest { action, params, default_task_id } => dispatch_tasks_request(&action, params, default_task_id, state).await?,
        Request::FastWorkerCloseTask { task_id } => {
            state.lifecycle.fast_worker_close_task(&task_id, &state.config.actor).await?;
            json!({ "ok": true })
        }
        Request::FastWorkerAdvanceLifecycle { task_id, action, target } => {
            let stage = state
                .lifecycle
                .advance_lifecycle(&task_id, "fast-worker", &action, target.as_deref(), &state.config.actor)
                .await?;
            json!({ "ok": true, "stage": stage })
        }
        Request::MergerComplete { task_id } => {
            let stage = state.lifecycle.advance_lifecycle(&task_id, "worker", "done", None, &state.config.actor).await?;
            json!({ "ok": true, "stage": stage })
        }
        Request::MergerConflict { task_id } => {
            let stage = state.lifecycle.advance_lifecycle(&task_id, "worker", "escalate", None, &state.config.actor).await?;
            json!({ "ok": true, "stage": stage })
        }
        Request::FinisherCloseTask { task_id } => {
            state.lifecycle.finisher_close_task(&task_id, &state.config.actor).await?;
            json!({ "ok": true })
        }
        Request::IssuerAdvanceLifecycle { task_id, action, target } => {
            let stage = state
                .lifecycle
                .advance_lifecycle(&task_id, "issuer", &action, target.as_deref(), &state.config.actor)
                .await?;
            json!({ "ok": true, "stage": stage })
        }
    };
    Ok(Response::ok(data))
}

/// `tasks_request` (§4.4): a single generic entry point that delegates to
/// the Task Store by action name, checked against the caller's role (§4.8)
/// the same way the dedicated verbs are — but against `action` as data
/// rather than the request's own static shape.
async fn dispatch_tasks_request(action: &str, params: Value, default_task_id: Option<String>, state: &DaemonState) -> Result<Value, DaemonError> {
    if let Some(role) = state.config.role.as_deref() {
        if !oms_engine::is_action_allowed(role, action) {
            return Err(DaemonError::Forbidden {
                role: role.to_string(),
                action: action.to_string(),
            });
        }
    }
    let id = || -> Result<String, DaemonError> {
        params
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| default_task_id.clone())
            .ok_or_else(|| DaemonError::BadRequest("tasks_request requires an id or a default task id".to_string()))
    };
    let actor = &state.config.actor;
    Ok(match action {
        "ready" => issues_to_value(state.store.ready().await),
        "list" => issues_to_value(state.store.list().await),
        "show" => to_value(state.store.show(&id()?).await?),
        "comments" => to_value(state.store.show(&id()?).await?.comments),
        "comment_add" => {
            let text = params
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| DaemonError::BadRequest("comment_add requires text".to_string()))?;
            if let Err(rejection) = state.verifier.check_comment(actor, text).await {
                return Err(oms_engine::EngineError::CompletionRejected(rejection.reason()).into());
            }
            to_value(state.store.comment(&id()?, actor, text).await?)
        }
        "query" => {
            let filter = QueryFilter {
                status: params.get("status").and_then(Value::as_str).map(|s| parse_enum("status", s)).transpose()?,
                issue_type: params.get("issueType").and_then(Value::as_str).map(|s| parse_enum("issue_type", s)).transpose()?,
                label: params.get("label").and_then(Value::as_str).map(str::to_string),
                assignee: params.get("assignee").and_then(Value::as_str).map(str::to_string),
            };
            issues_to_value(state.store.query(&filter).await)
        }
        "search" => {
            let query = params.get("query").and_then(Value::as_str).unwrap_or_default();
            issues_to_value(state.store.search(query).await)
        }
        "dep_tree" => issues_to_value(state.store.dep_tree(&id()?).await?),
        "types" => json!({ "types": ["task", "bug", "feature", "epic", "group", "noop", "chore", "agent", "role", "rig", "convoy", "event", "slot", "merge-request", "molecule", "gate"] }),
        "create" => {
            let title = params
                .get("title")
                .and_then(Value::as_str)
                .ok_or_else(|| DaemonError::BadRequest("create requires title".to_string()))?;
            let opts = CreateOpts {
                issue_type: params
                    .get("issueType")
                    .and_then(Value::as_str)
                    .map(|s| parse_enum("issue_type", s))
                    .transpose()?
                    .unwrap_or_default(),
                priority: params.get("priority").and_then(Value::as_u64).map(|p| p as u8).unwrap_or(2),
                description: params.get("description").and_then(Value::as_str).map(str::to_string),
                ..Default::default()
            };
            to_value(state.store.create(title, actor, opts).await?)
        }
        "update" => {
            let patch = UpdatePatch {
                status: params.get("status").and_then(Value::as_str).map(|s| parse_enum("status", s)).transpose()?,
                description: params.get("description").and_then(Value::as_str).map(str::to_string),
                ..Default::default()
            };
            to_value(state.store.update(&id()?, actor, patch).await?)
        }
        "close" => to_value(state.store.close(&id()?, actor, None).await?),
        other => return Err(DaemonError::BadRequest(format!("unrecognized tasks_request action {other}"))),
    })
}

/// Polls the registry until `agent_id` is no longer active or is unknown,
/// backing the `wait_for_agent` long-poll verb (§4.4). The registry has no
/// per-agent wakeup channel, so this trades a short poll interval for the
/// simplicity of reusing the existing snapshot reads.
async fn wait_for_agent_inactive(registry: &oms_registry::AgentRegistry, agent_id: &str) {
    loop {
        match registry.get(agent_id) {
            Some(entry) if entry.status.is_active() => {
                tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            }
            _ => return,
        }
    }
}

/// Role gate: most requests carry no role of their own, so permission is
/// evaluated against the daemon's own configured role (the role the
/// launching agent was spawned with), mirroring the extension tool surface
/// (§4.8). Requests with no corresponding action name are always allowed.
fn check_permission(request: &Request, state: &DaemonState) -> Result<(), DaemonError> {
    let Some(role) = state.config.role.as_deref() else {
        return Ok(());
    };
    let action = match request {
        Request::Create { .. } => "create",
        Request::CreateBatch { .. } => "create_batch",
        Request::Show { .. } => "show",
        Request::List => "list",
        Request::Ready => "ready",
        Request::Update { .. } => "update",
        Request::Close { .. } => "close",
        Request::Comment { .. } => "comment_add",
        Request::DepAdd { .. } => "dep_add",
        Request::DepTree { .. } => "dep_tree",
        Request::Search { .. } => "search",
        Request::Query { .. } => "query",
        Request::Delete { .. } => "delete",
        _ => return Ok(()),
    };
    if oms_engine::is_action_allowed(role, action) {
        Ok(())
    } else {
        Err(DaemonError::Forbidden {
            role: role.to_string(),
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
