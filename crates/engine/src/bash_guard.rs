// SPDX-License-Identifier: MIT

//! The bash guard (§4.8): a lightweight, quote-aware tokenizer that blocks
//! two classes of command an agent's bash tool should never run — history-
//! rewriting git verbs, and direct writes to the task store's own files
//! (agents go through the extension tool surface, not the filesystem, to
//! mutate tracker state).

const BLOCKED_GIT_VERBS: &[&str] = &["commit", "add", "push", "stash", "checkout", "reset", "rebase", "merge", "cherry-pick"];
const TRACKER_MARKERS: &[&str] = &["_index.json", "_activity.json", "tasks.json", "tasks/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BashVerdict {
    Allowed,
    Blocked(String),
}

/// Splits a command line into words, honoring single and double quotes
/// (no escape-sequence handling — good enough to find verbs and paths, not
/// to fully re-parse shell grammar).
fn tokenize(cmd: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    for ch in cmd.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            c if c.is_whitespace() && !in_single && !in_double => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub fn classify_bash_command(cmd: &str) -> BashVerdict {
    let tokens = tokenize(cmd);
    for (i, token) in tokens.iter().enumerate() {
        if token == "git" {
            if let Some(verb) = tokens.get(i + 1) {
                if BLOCKED_GIT_VERBS.contains(&verb.as_str()) {
                    return BashVerdict::Blocked(format!("git {verb} is not permitted"));
                }
            }
        }
        if TRACKER_MARKERS.iter().any(|marker| token.contains(marker)) {
            return BashVerdict::Blocked(format!("direct access to tracker storage ({token}) is not permitted"));
        }
    }
    BashVerdict::Allowed
}

#[cfg(test)]
#[path = "bash_guard_tests.rs"]
mod tests;
