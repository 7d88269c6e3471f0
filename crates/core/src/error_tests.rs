// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn not_found_message_includes_id() {
    let err = CoreError::NotFound("fix-bug-aaaa".into());
    assert_eq!(err.to_string(), "issue not found: fix-bug-aaaa");
}

#[test]
fn invalid_status_message_names_both() {
    let err = CoreError::InvalidStatus {
        status: "spawning".into(),
        issue_type: "task".into(),
    };
    assert!(err.to_string().contains("spawning"));
    assert!(err.to_string().contains("task"));
}
