// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn sha1_hex_is_stable_and_40_chars() {
    let a = sha1_hex(b"hello world");
    let b = sha1_hex(b"hello world");
    assert_eq!(a, b);
    assert_eq!(a.len(), 40);
}

#[test]
fn changed_since_detects_modified_and_new_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = PathBuf::from("src/lib.rs");
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join(&file), "fn a() {}").unwrap();
    let baseline = capture_baseline(dir.path(), &[file.clone()]).unwrap();

    std::fs::write(dir.path().join(&file), "fn a() { 1 + 1; }").unwrap();
    let new_file = PathBuf::from("src/new.rs");
    std::fs::write(dir.path().join(&new_file), "fn b() {}").unwrap();

    let changed = changed_since(dir.path(), &baseline, &[file.clone(), new_file.clone()]).unwrap();
    assert!(changed.contains(&file));
    assert!(changed.contains(&new_file));
}

#[test]
fn unchanged_file_is_not_reported() {
    let dir = tempfile::tempdir().unwrap();
    let file = PathBuf::from("src/lib.rs");
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join(&file), "fn a() {}").unwrap();
    let baseline = capture_baseline(dir.path(), &[file.clone()]).unwrap();
    let changed = changed_since(dir.path(), &baseline, &[file.clone()]).unwrap();
    assert!(changed.is_empty());
}

#[test]
fn trivial_diffs_are_not_substantive() {
    let added = vec!["use std::fmt;".to_string(), "// a comment".to_string(), "".to_string()];
    let removed = vec!["use std::io;".to_string()];
    assert!(!is_substantive_diff(&added, &removed));
}

#[test]
fn logic_change_is_substantive() {
    let added = vec!["fn a() { 1 + 1 }".to_string()];
    assert!(is_substantive_diff(&added, &[]));
}

#[test]
fn classify_no_changes_needed_from_text_alone() {
    assert_eq!(
        classify_completion("This task does not require any changes."),
        CompletionClass::NoChangesNeeded
    );
    assert_eq!(classify_completion("Done!"), CompletionClass::NonCompletion);
}

#[test]
fn classify_implementation_claim_from_completion_signals() {
    assert_eq!(classify_completion("Implemented the fix."), CompletionClass::ImplementationClaim);
    assert_eq!(
        classify_completion("Here is what changed and what's remaining."),
        CompletionClass::ImplementationClaim
    );
}

#[test]
fn extract_candidate_paths_finds_backtick_and_bare_paths() {
    let paths = extract_candidate_paths("Implemented fix in `src/foo.ts`; verified.");
    assert_eq!(paths, vec![PathBuf::from("src/foo.ts")]);
}

#[test]
fn completion_rejection_reason_mentions_claimed_paths_and_write_intents() {
    let rejection = CompletionRejection {
        claimed_paths: vec![PathBuf::from("src/foo.ts")],
        write_intent_count: 0,
        observed_changes: vec![],
        git_status_error: None,
    };
    let reason = rejection.reason();
    assert!(reason.contains("no substantive file changes were verified"));
    assert!(reason.contains("claimed_paths=src/foo.ts"));
    assert!(reason.contains("edit_write_calls=0"));
}

#[tokio::test]
async fn check_comment_rejects_an_implementation_claim_with_no_real_changes() {
    let dir = tempfile::tempdir().unwrap();
    std::process::Command::new("git").arg("init").arg("-q").current_dir(dir.path()).status().unwrap();
    let verifier = CompletionVerifier::new(dir.path().to_path_buf());
    verifier.start_agent("agent-1").await.unwrap();

    let result = verifier.check_comment("agent-1", "Implemented fix in src/foo.ts; verified").await;
    assert!(result.is_err());
    let rejection = result.unwrap_err();
    assert_eq!(rejection.claimed_paths, vec![PathBuf::from("src/foo.ts")]);
    assert_eq!(rejection.write_intent_count, 0);
}

#[tokio::test]
async fn check_comment_admits_a_claim_backed_by_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    std::process::Command::new("git").arg("init").arg("-q").current_dir(dir.path()).status().unwrap();
    let verifier = CompletionVerifier::new(dir.path().to_path_buf());
    verifier.start_agent("agent-1").await.unwrap();

    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/foo.ts"), "export function foo() { return 1 + 1; }").unwrap();
    verifier.record_write_intent("agent-1", PathBuf::from("src/foo.ts"));

    let result = verifier.check_comment("agent-1", "Implemented fix in `src/foo.ts`; verified").await;
    assert!(result.is_ok());
}
