// SPDX-License-Identifier: MIT

//! Slug-based issue id derivation (§4.1 `create`).

const MAX_SLUG_LEN: usize = 16;
const MAX_COLLISION_RETRIES: u32 = 3;

/// Normalize a candidate string (a `name` hint or a title) into a slug body:
/// lowercase, `[a-z0-9]+` runs joined by single `-`, trimmed of leading and
/// trailing `-`, truncated to [`MAX_SLUG_LEN`] characters.
pub fn normalize(candidate: &str) -> String {
    let mut out = String::with_capacity(candidate.len());
    let mut last_was_sep = true; // suppress leading '-'
    for ch in candidate.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('-');
            last_was_sep = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.len() > MAX_SLUG_LEN {
        out.truncate(MAX_SLUG_LEN);
        while out.ends_with('-') {
            out.pop();
        }
    }
    out
}

/// A source of short random hex suffixes, abstracted so tests can make id
/// generation deterministic.
pub trait HexSource: Send + Sync {
    fn hex(&self, chars: usize) -> String;
}

#[derive(Clone, Default)]
pub struct UuidHexSource;

impl HexSource for UuidHexSource {
    fn hex(&self, chars: usize) -> String {
        let full = uuid::Uuid::new_v4().simple().to_string();
        full.chars().take(chars).collect()
    }
}

/// Derive a candidate id for a new issue, given an optional `name` hint, the
/// title, an epoch-ms timestamp (for the legacy fallback form), a hex
/// source, and a predicate telling whether a candidate id already exists.
///
/// Returns the first non-colliding id: up to [`MAX_COLLISION_RETRIES`]
/// attempts at `<slug>-<4hex>`, then the legacy `task-<ms>-<6hex>` form
/// (itself retried against collisions, since a legacy-form collision is
/// vanishingly unlikely but not impossible).
pub fn derive_id(
    name_hint: Option<&str>,
    title: &str,
    epoch_ms: u64,
    hex: &impl HexSource,
    exists: impl Fn(&str) -> bool,
) -> String {
    let base = name_hint
        .map(normalize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| normalize(title));

    if !base.is_empty() {
        for _ in 0..MAX_COLLISION_RETRIES {
            let candidate = format!("{base}-{}", hex.hex(4));
            if !exists(&candidate) {
                return candidate;
            }
        }
    }

    loop {
        let candidate = format!("task-{epoch_ms}-{}", hex.hex(6));
        if !exists(&candidate) {
            return candidate;
        }
    }
}

/// Derive the id for an `agent`-typed issue: always `agent-<id>` where `<id>`
/// is the same slug-or-legacy derivation used for ordinary issues.
pub fn derive_agent_id(
    name_hint: Option<&str>,
    title: &str,
    epoch_ms: u64,
    hex: &impl HexSource,
    exists: impl Fn(&str) -> bool,
) -> String {
    let inner = derive_id(name_hint, title, epoch_ms, hex, |candidate| {
        exists(&format!("agent-{candidate}"))
    });
    format!("agent-{inner}")
}

#[cfg(test)]
#[path = "slug_tests.rs"]
mod tests;
