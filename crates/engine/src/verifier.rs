// SPDX-License-Identifier: MIT

//! The worker completion verifier (§4.7): fingerprints the working tree
//! before an agent starts, and again when it claims completion, to decide
//! whether the claim is backed by a real change.

use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    fingerprints: HashMap<PathBuf, String>,
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn fingerprint_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(sha1_hex(&bytes))
}

/// Fingerprints every file in `files` (relative to `root`), skipping files
/// that no longer exist.
pub fn capture_baseline(root: &Path, files: &[PathBuf]) -> std::io::Result<Baseline> {
    let mut fingerprints = HashMap::new();
    for file in files {
        let full = root.join(file);
        if full.is_file() {
            fingerprints.insert(file.clone(), fingerprint_file(&full)?);
        }
    }
    Ok(Baseline { fingerprints })
}

/// Returns the subset of `files` whose content differs from `baseline`
/// (including files that are new since the baseline was captured).
pub fn changed_since(root: &Path, baseline: &Baseline, files: &[PathBuf]) -> std::io::Result<Vec<PathBuf>> {
    let mut changed = Vec::new();
    for file in files {
        let full = root.join(file);
        if !full.is_file() {
            continue;
        }
        let current = fingerprint_file(&full)?;
        match baseline.fingerprints.get(file) {
            Some(prior) if *prior == current => {}
            _ => changed.push(file.clone()),
        }
    }
    Ok(changed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionClass {
    /// The agent claims no changes were needed, and the tree backs that up.
    NoChangesNeeded,
    /// At least one file changed substantively.
    ImplementationClaim,
    /// The agent claims completion but nothing substantive changed.
    NonCompletion,
}

/// A line is trivial if it's blank, a line comment, or a bare `use`/`import`
/// statement — changes limited to these don't count as "substantive".
fn is_trivial_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with("//")
        || trimmed.starts_with('#')
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with("use ")
        || trimmed.starts_with("import ")
}

/// Whether a unified-diff-style set of added/removed lines contains any
/// substantive (non-trivial) change.
pub fn is_substantive_diff(added: &[String], removed: &[String]) -> bool {
    added.iter().any(|l| !is_trivial_line(l)) || removed.iter().any(|l| !is_trivial_line(l))
}

const NO_CHANGES_PATTERNS: [&str; 3] = ["no changes needed", "does not require any changes", "already complete"];
const COMPLETION_SIGNALS: [&str; 4] = ["what changed", "verified", "remaining", "completion"];
const IMPLEMENTATION_VERBS: [&str; 6] = ["implemented", "fixed", "added", "updated", "refactored", "wrote"];

/// Classifies a completion claim purely from its text (§4.7). The result
/// decides whether a caller must additionally verify substantive file
/// changes before admitting the comment.
pub fn classify_completion(comment_text: &str) -> CompletionClass {
    let lower = comment_text.to_lowercase();
    let claims_no_changes_needed = NO_CHANGES_PATTERNS.iter().any(|p| lower.contains(p));
    let claims_implementation = COMPLETION_SIGNALS.iter().any(|s| lower.contains(s)) || IMPLEMENTATION_VERBS.iter().any(|v| lower.contains(v));
    if claims_implementation {
        CompletionClass::ImplementationClaim
    } else if claims_no_changes_needed {
        CompletionClass::NoChangesNeeded
    } else {
        CompletionClass::NonCompletion
    }
}

/// Runs `git status --porcelain --untracked-files=all` in `root` and
/// returns the changed/untracked paths it reports.
pub async fn git_status_paths(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let output = tokio::process::Command::new("git")
        .args(["status", "--porcelain", "--untracked-files=all"])
        .current_dir(root)
        .output()
        .await?;
    if !output.status.success() {
        return Err(std::io::Error::new(std::io::ErrorKind::Other, String::from_utf8_lossy(&output.stderr).into_owned()));
    }
    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.get(3..))
        .map(|p| PathBuf::from(p.trim()))
        .collect())
}

fn looks_like_path(token: &str) -> bool {
    !token.is_empty() && !token.starts_with('/') && !token.contains(' ') && (token.contains('/') || token.contains('.'))
}

/// Extracts candidate file paths from a completion comment: backtick-quoted
/// spans and bare relative-looking tokens (§4.7).
pub fn extract_candidate_paths(comment_text: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for (i, segment) in comment_text.split('`').enumerate() {
        if i % 2 == 1 {
            let trimmed = segment.trim();
            if looks_like_path(trimmed) {
                found.push(PathBuf::from(trimmed));
            }
            continue;
        }
        for token in segment.split_whitespace() {
            let trimmed = token.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '.' | '(' | ')'));
            if looks_like_path(trimmed) {
                found.push(PathBuf::from(trimmed));
            }
        }
    }
    found.sort();
    found.dedup();
    found
}

fn file_is_substantively_populated(root: &Path, path: &Path) -> bool {
    let full = root.join(path);
    let Ok(content) = std::fs::read_to_string(&full) else {
        return false;
    };
    let lines: Vec<String> = content.lines().map(str::to_string).collect();
    is_substantive_diff(&lines, &[])
}

/// Per-agent state for the completion verifier: the pre-work baseline plus
/// every path touched by an `edit`/`write` tool call since.
struct AgentVerifyState {
    baseline: Baseline,
    write_intents: HashSet<PathBuf>,
}

/// Rejection detail for a blocked `comment_add` (§4.7): callers render this
/// into the tool-call rejection reason.
#[derive(Debug, Clone)]
pub struct CompletionRejection {
    pub claimed_paths: Vec<PathBuf>,
    pub write_intent_count: usize,
    pub observed_changes: Vec<PathBuf>,
    pub git_status_error: Option<String>,
}

impl CompletionRejection {
    pub fn reason(&self) -> String {
        let claimed = self
            .claimed_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",");
        let mut reason = format!(
            "no substantive file changes were verified; claimed_paths={claimed}; edit_write_calls={}",
            self.write_intent_count
        );
        if !self.observed_changes.is_empty() {
            let preview: Vec<String> = self.observed_changes.iter().take(8).map(|p| p.display().to_string()).collect();
            reason.push_str(&format!("; observed_changes={}", preview.join(",")));
        }
        if let Some(err) = &self.git_status_error {
            reason.push_str(&format!("; git_status_error={err}"));
        }
        reason
    }
}

/// The worker completion verifier (§4.7): a per-agent pre-comment hook that
/// baselines the working tree at worker start and blocks `comment_add`
/// calls that claim implementation work with no substantive backing.
pub struct CompletionVerifier {
    root: PathBuf,
    agents: Mutex<HashMap<String, AgentVerifyState>>,
}

impl CompletionVerifier {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            agents: Mutex::new(HashMap::new()),
        }
    }

    /// Captures the pre-work baseline for a newly spawned agent.
    pub async fn start_agent(&self, agent_id: &str) -> std::io::Result<()> {
        let paths = git_status_paths(&self.root).await?;
        let baseline = capture_baseline(&self.root, &paths)?;
        self.agents.lock().insert(
            agent_id.to_string(),
            AgentVerifyState {
                baseline,
                write_intents: HashSet::new(),
            },
        );
        Ok(())
    }

    pub fn forget_agent(&self, agent_id: &str) {
        self.agents.lock().remove(agent_id);
    }

    /// Records an `edit`/`write` tool call's target path as a write intent.
    pub fn record_write_intent(&self, agent_id: &str, path: PathBuf) {
        if let Some(state) = self.agents.lock().get_mut(agent_id) {
            state.write_intents.insert(path);
        }
    }

    /// Checks a `comment_add` call against the agent's baseline. `Ok(())`
    /// admits the comment; `Err` carries the rejection detail.
    pub async fn check_comment(&self, agent_id: &str, comment_text: &str) -> Result<(), CompletionRejection> {
        if classify_completion(comment_text) != CompletionClass::ImplementationClaim {
            return Ok(());
        }
        let claimed_paths = extract_candidate_paths(comment_text);
        let write_intent_count = self.agents.lock().get(agent_id).map(|s| s.write_intents.len()).unwrap_or(0);

        let mut candidates: Vec<PathBuf> = claimed_paths.clone();
        if let Some(state) = self.agents.lock().get(agent_id) {
            candidates.extend(state.write_intents.iter().cloned());
        }
        candidates.sort();
        candidates.dedup();

        let status = git_status_paths(&self.root).await;
        let git_status_error = status.as_ref().err().map(|e| e.to_string());
        let observed: Vec<PathBuf> = status.unwrap_or_default();

        let substantive: Vec<PathBuf> = candidates
            .iter()
            .filter(|p| observed.contains(p) || self.changed_since_baseline(agent_id, p))
            .filter(|p| file_is_substantively_populated(&self.root, p))
            .cloned()
            .collect();

        if substantive.is_empty() {
            Err(CompletionRejection {
                claimed_paths,
                write_intent_count,
                observed_changes: observed,
                git_status_error,
            })
        } else {
            Ok(())
        }
    }

    fn changed_since_baseline(&self, agent_id: &str, path: &Path) -> bool {
        let agents = self.agents.lock();
        let Some(state) = agents.get(agent_id) else {
            return true;
        };
        changed_since(&self.root, &state.baseline, std::slice::from_ref(&path.to_path_buf()))
            .map(|changed| !changed.is_empty())
            .unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
