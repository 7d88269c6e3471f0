// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;

const REQUIRED: &[&str] = &["OMS_SOCKET_PATH", "OMS_SESSION_DIR"];

fn clear_all() {
    for var in REQUIRED {
        std::env::remove_var(var);
    }
    for var in [
        "OMS_TASK_ID",
        "OMS_AGENT_ID",
        "OMS_ACTOR",
        "OMS_ROLE",
        "OMS_HEARTBEAT_INTERVAL_MS",
        "OMS_AGENT_TTL_MS",
        "OMS_MAX_AGENT_ISSUES",
        "OMS_MAX_EVENT_BUFFER",
        "OMS_MAX_ACTIVITY_LOG",
        "OMS_MESSAGE_HISTORY_MAX",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn missing_socket_path_is_an_error() {
    clear_all();
    std::env::set_var("OMS_SESSION_DIR", "/tmp/session");
    let err = DaemonConfig::from_env().unwrap_err();
    assert!(matches!(err, DaemonError::MissingEnv(name) if name == "OMS_SOCKET_PATH"));
    clear_all();
}

#[test]
#[serial]
fn defaults_are_applied_when_optional_vars_absent() {
    clear_all();
    std::env::set_var("OMS_SOCKET_PATH", "/tmp/oms.sock");
    std::env::set_var("OMS_SESSION_DIR", "/tmp/session");
    let cfg = DaemonConfig::from_env().unwrap();
    assert_eq!(cfg.heartbeat_interval_ms, 5_000);
    assert_eq!(cfg.agent_ttl_ms, 120_000);
    assert_eq!(cfg.max_agent_issues, 500);
    assert_eq!(cfg.actor, "system");
    assert_eq!(cfg.role, None);
    clear_all();
}

#[test]
#[serial]
fn overrides_are_parsed() {
    clear_all();
    std::env::set_var("OMS_SOCKET_PATH", "/tmp/oms.sock");
    std::env::set_var("OMS_SESSION_DIR", "/tmp/session");
    std::env::set_var("OMS_HEARTBEAT_INTERVAL_MS", "1500");
    std::env::set_var("OMS_ROLE", "implementer");
    let cfg = DaemonConfig::from_env().unwrap();
    assert_eq!(cfg.heartbeat_interval_ms, 1_500);
    assert_eq!(cfg.role.as_deref(), Some("implementer"));
    clear_all();
}

#[test]
#[serial]
fn invalid_numeric_override_is_rejected() {
    clear_all();
    std::env::set_var("OMS_SOCKET_PATH", "/tmp/oms.sock");
    std::env::set_var("OMS_SESSION_DIR", "/tmp/session");
    std::env::set_var("OMS_MAX_EVENT_BUFFER", "not-a-number");
    let err = DaemonConfig::from_env().unwrap_err();
    assert!(matches!(err, DaemonError::InvalidEnv { name, .. } if name == "OMS_MAX_EVENT_BUFFER"));
    clear_all();
}
