// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn allows_ordinary_git_status() {
    assert_eq!(classify_bash_command("git status"), BashVerdict::Allowed);
}

#[test]
fn blocks_git_push() {
    assert!(matches!(classify_bash_command("git push origin main"), BashVerdict::Blocked(_)));
}

#[test]
fn blocks_git_reset_hard() {
    assert!(matches!(classify_bash_command("git reset --hard HEAD~1"), BashVerdict::Blocked(_)));
}

#[test]
fn blocks_direct_writes_to_tracker_files() {
    assert!(matches!(
        classify_bash_command("echo '{}' > tasks/_index.json"),
        BashVerdict::Blocked(_)
    ));
}

#[test]
fn quoted_arguments_are_not_split() {
    let tokens = tokenize("git commit -m 'fix the git push bug'");
    assert_eq!(tokens[4], "fix the git push bug");
}

#[test]
fn blocked_verb_inside_quotes_is_not_flagged() {
    assert_eq!(classify_bash_command("git log --grep 'mentions git push'"), BashVerdict::Allowed);
}

#[test]
fn blocks_git_commit() {
    assert!(matches!(classify_bash_command("git commit -m 'wip'"), BashVerdict::Blocked(_)));
}

#[test]
fn blocks_git_merge_and_cherry_pick() {
    assert!(matches!(classify_bash_command("git merge feature"), BashVerdict::Blocked(_)));
    assert!(matches!(classify_bash_command("git cherry-pick abc123"), BashVerdict::Blocked(_)));
}
