// SPDX-License-Identifier: MIT

use super::*;
use oms_store::StoreError;

#[test]
fn not_found_categorizes_as_not_found() {
    let err = DaemonError::Store(StoreError::NotFound("task-1".to_string()));
    assert_eq!(err.category(), "not_found");
}

#[test]
fn forbidden_categorizes_as_forbidden() {
    let err = DaemonError::Forbidden {
        role: "reviewer".to_string(),
        action: "create".to_string(),
    };
    assert_eq!(err.category(), "forbidden");
}

#[test]
fn missing_env_categorizes_as_config_error() {
    let err = DaemonError::MissingEnv("OMS_SOCKET_PATH".to_string());
    assert_eq!(err.category(), "config_error");
}
