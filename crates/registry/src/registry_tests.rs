// SPDX-License-Identifier: MIT

use super::*;
use oms_core::FixedClock;
use serde_json::json;

fn registry_with_ttl(ttl_ms: u64) -> (AgentRegistry, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(1_700_000_000_000));
    let registry = AgentRegistry::new(clock.clone(), ttl_ms, 4, 4);
    (registry, clock)
}

#[test]
fn register_then_get_round_trips() {
    let (registry, _clock) = registry_with_ttl(120_000);
    registry
        .register(RegistryId::new("agent-worker-one-abcd"), "worker", Some(42), None)
        .unwrap();
    let entry = registry.get("agent-worker-one-abcd").unwrap();
    assert_eq!(entry.role, "worker");
    assert_eq!(entry.pid, Some(42));
    assert!(entry.status.is_active());
}

#[test]
fn double_register_is_rejected() {
    let (registry, _clock) = registry_with_ttl(120_000);
    registry
        .register(RegistryId::new("a"), "worker", None, None)
        .unwrap();
    let err = registry.register(RegistryId::new("a"), "worker", None, None).unwrap_err();
    assert!(matches!(err, RegistryError::AlreadyRegistered(_)));
}

#[test]
fn missing_agent_history_is_empty_not_error() {
    let (registry, _clock) = registry_with_ttl(120_000);
    assert!(registry.read_message_history("nope").is_empty());
}

#[test]
fn event_buffer_is_capped() {
    let (registry, _clock) = registry_with_ttl(120_000);
    registry.register(RegistryId::new("a"), "worker", None, None).unwrap();
    for i in 0..10 {
        registry.push_event("a", "tool_call", json!({"i": i})).unwrap();
    }
    assert_eq!(registry.read_events("a").len(), 4);
}

#[test]
fn message_history_captures_message_events_and_is_capped() {
    let (registry, _clock) = registry_with_ttl(120_000);
    registry.register(RegistryId::new("a"), "worker", None, None).unwrap();
    for i in 0..6 {
        registry
            .push_event("a", "message", json!({"role": "assistant", "content": format!("msg {i}")}))
            .unwrap();
    }
    let history = registry.read_message_history("a");
    assert_eq!(history.len(), 4);
    assert_eq!(history.last().unwrap().content, "msg 5");
}

#[test]
fn sweep_expired_marks_stale_agents_terminal() {
    let (registry, clock) = registry_with_ttl(1000);
    registry.register(RegistryId::new("a"), "worker", None, None).unwrap();
    clock.advance_ms(2000);
    let expired = registry.sweep_expired();
    assert_eq!(expired, vec![RegistryId::new("a")]);
    assert!(registry.get("a").unwrap().status.is_terminal());
}

#[test]
fn heartbeat_revives_terminal_agent() {
    let (registry, clock) = registry_with_ttl(1000);
    registry.register(RegistryId::new("a"), "worker", None, None).unwrap();
    clock.advance_ms(2000);
    registry.sweep_expired();
    assert!(registry.get("a").unwrap().status.is_terminal());
    registry.heartbeat("a").unwrap();
    assert!(registry.get("a").unwrap().status.is_active());
}

#[test]
fn get_active_and_terminal_partition_the_set() {
    let (registry, clock) = registry_with_ttl(1000);
    registry.register(RegistryId::new("a"), "worker", None, None).unwrap();
    registry.register(RegistryId::new("b"), "worker", None, None).unwrap();
    clock.advance_ms(2000);
    registry.heartbeat("a").unwrap();
    registry.sweep_expired();
    assert_eq!(registry.get_active().len(), 1);
    assert_eq!(registry.get_terminal().len(), 1);
}
