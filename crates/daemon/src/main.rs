// SPDX-License-Identifier: MIT

//! omsd — the orchestration service daemon.
//!
//! Launched once per session by the orchestrator (`OMS_*` env vars set by
//! the launching process, not flags). Owns the task store, agent registry,
//! and lifecycle engine for the lifetime of the session and exits when its
//! socket is closed or it receives SIGTERM/SIGINT.

use oms_core::SystemClock;
use oms_daemon::{DaemonConfig, DaemonState, Listener, TokioProcessSupervisor};
use oms_engine::{CompletionVerifier, ConflictCoordinator, LifecycleCoordinator, ProcessSupervisor};
use oms_registry::AgentRegistry;
use oms_store::TaskStore;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DaemonConfig::from_env()?;
    let _log_guard = setup_logging(&config);

    info!(socket = %config.socket_path.display(), "starting omsd");

    let clock: Arc<dyn oms_core::Clock> = Arc::new(SystemClock::default());
    let store = Arc::new(TaskStore::open_with(config.store_root(), clock.clone(), config.max_activity_log)?);
    let registry = Arc::new(AgentRegistry::new(
        clock.clone(),
        config.agent_ttl_ms,
        config.max_event_buffer,
        config.message_history_max,
    ));
    let supervisor: Arc<dyn ProcessSupervisor> = Arc::new(TokioProcessSupervisor::new("oms-agent-launch", config.session_dir.clone()));
    let lifecycle = Arc::new(LifecycleCoordinator::new(store.clone(), registry.clone(), supervisor, clock.clone()));
    let conflicts = Arc::new(ConflictCoordinator::new(clock.clone()));
    let verifier = Arc::new(CompletionVerifier::new(config.session_dir.clone()));

    let state = Arc::new(DaemonState {
        config: config.clone(),
        store: store.clone(),
        registry: registry.clone(),
        lifecycle,
        conflicts,
        verifier,
        clock,
    });

    let listener = Listener::bind(state.clone())?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let listener_handle = tokio::spawn(listener.run(shutdown_rx));

    let sweep_handle = tokio::spawn(sweep_loop(registry.clone(), config.heartbeat_interval_ms));

    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    info!("shutting down");
    let _ = shutdown_tx.send(());
    sweep_handle.abort();
    if let Err(e) = listener_handle.await {
        error!(error = %e, "listener task panicked");
    }
    std::fs::remove_file(&config.socket_path).ok();
    Ok(())
}

/// Periodically marks agents that have missed their heartbeat TTL as
/// terminal, so a crashed subprocess doesn't look "active" forever (§4.2).
async fn sweep_loop(registry: Arc<AgentRegistry>, interval_ms: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(interval_ms.max(1_000)));
    loop {
        ticker.tick().await;
        let expired = registry.sweep_expired();
        if !expired.is_empty() {
            info!(count = expired.len(), "swept expired agents");
        }
    }
}

fn setup_logging(config: &DaemonConfig) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(&config.session_dir, "omsd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_ansi(false)
        .init();
    guard
}
