// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn worker_may_comment_but_not_update_or_close() {
    assert!(is_action_allowed("worker", "comment_add"));
    assert!(!is_action_allowed("worker", "update"));
    assert!(!is_action_allowed("worker", "close"));
}

#[test]
fn finisher_may_update_but_not_close() {
    assert!(is_action_allowed("finisher", "update"));
    assert!(!is_action_allowed("finisher", "close"));
}

#[test]
fn steering_may_not_comment() {
    assert!(is_action_allowed("steering", "show"));
    assert!(!is_action_allowed("steering", "comment_add"));
}

#[test]
fn singularity_has_full_lifecycle_access_but_not_comment() {
    assert!(is_action_allowed("singularity", "create"));
    assert!(is_action_allowed("singularity", "update"));
    assert!(is_action_allowed("singularity", "close"));
    assert!(!is_action_allowed("singularity", "comment_add"));
}

#[test]
fn unknown_role_is_denied_everything() {
    assert!(!is_action_allowed("ghost", "show"));
}
