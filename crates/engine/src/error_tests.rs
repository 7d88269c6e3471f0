// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn forbidden_action_names_role_and_action() {
    let err = EngineError::ForbiddenAction {
        role: "reviewer".into(),
        action: "close".into(),
    };
    assert!(err.to_string().contains("reviewer"));
    assert!(err.to_string().contains("close"));
}
