// SPDX-License-Identifier: MIT

use super::*;
use std::collections::HashSet;

#[derive(Clone)]
struct FixedHex(&'static str);

impl HexSource for FixedHex {
    fn hex(&self, chars: usize) -> String {
        self.0.chars().take(chars).collect()
    }
}

#[test]
fn normalize_lowercases_and_joins_runs() {
    assert_eq!(normalize("Fix TypeScript Bugs!!"), "fix-typescript-bugs");
}

#[test]
fn normalize_truncates_to_16_chars() {
    let slug = normalize("Fix TypeScript build errors in test files");
    assert_eq!(slug, "fix-typescript-b");
    assert_eq!(slug.len(), 16);
}

#[test]
fn normalize_of_pure_punctuation_is_empty() {
    assert_eq!(normalize("###"), "");
    assert_eq!(normalize("@@@"), "");
}

#[test]
fn derive_id_blank_name_falls_back_to_title() {
    let id = derive_id(
        Some("   "),
        "Fix TypeScript build errors in test files",
        1_700_000_000_000,
        &FixedHex("abcd1234"),
        |_| false,
    );
    assert_eq!(id, "fix-typescript-b-abcd");
}

#[test]
fn derive_id_falls_back_to_legacy_form_when_unslug_gable() {
    let id = derive_id(Some("@@@"), "###", 1_700_000_000_000, &FixedHex("abcdef"), |_| false);
    assert_eq!(id, "task-1700000000000-abcdef");
}

#[test]
fn derive_id_retries_on_collision_then_falls_back() {
    let mut taken: HashSet<String> = HashSet::new();
    taken.insert("fix-bug-aaaa".to_string());
    taken.insert("fix-bug-aaaa".to_string());
    // every 4-hex attempt collides (fixed hex source), so after 3 retries it
    // must fall back to the legacy form.
    let id = derive_id(
        Some("fix bug"),
        "fix bug",
        1_700_000_000_000,
        &FixedHex("aaaaaa"),
        |candidate| candidate.starts_with("fix-bug-"),
    );
    assert!(id.starts_with("task-1700000000000-"));
}

#[test]
fn derive_agent_id_always_prefixed() {
    let id = derive_agent_id(Some("worker one"), "worker one", 1, &FixedHex("1234abcd"), |_| false);
    assert!(id.starts_with("agent-worker-one-"));
}
