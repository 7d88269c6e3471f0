// SPDX-License-Identifier: MIT

//! Per-role extension tool allowlists (§4.8).

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Actions shared by every worker-side role (§4.8): they observe and
/// comment on tasks but never mutate issue state directly — that goes
/// through the lifecycle verbs instead.
const WORKER_ACTIONS: [&str; 9] = [
    "show",
    "list",
    "search",
    "ready",
    "comments",
    "comment_add",
    "query",
    "dep_tree",
    "types",
];

/// `steering` observes the same surface as the worker roles but may not
/// leave comments on tasks it isn't assigned to.
const STEERING_ACTIONS: [&str; 8] = ["show", "list", "search", "ready", "comments", "query", "dep_tree", "types"];

pub static ROLE_ACTIONS: LazyLock<HashMap<&'static str, HashSet<&'static str>>> = LazyLock::new(|| {
    let mut roles = HashMap::new();
    roles.insert("worker", WORKER_ACTIONS.into_iter().collect());
    roles.insert("designer", WORKER_ACTIONS.into_iter().collect());
    roles.insert("fast-worker", WORKER_ACTIONS.into_iter().collect());
    roles.insert("issuer", WORKER_ACTIONS.into_iter().collect());
    roles.insert(
        "finisher",
        WORKER_ACTIONS.into_iter().chain(["create", "update"]).collect(),
    );
    roles.insert("steering", STEERING_ACTIONS.into_iter().collect());
    roles.insert(
        "singularity",
        STEERING_ACTIONS.into_iter().chain(["create", "update", "close"]).collect(),
    );
    roles
});

/// Whether `role` is permitted to invoke `action` through the extension
/// tool surface.
pub fn is_action_allowed(role: &str, action: &str) -> bool {
    ROLE_ACTIONS
        .get(role)
        .map(|allowed| allowed.contains("*") || allowed.contains(action))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod tests;
