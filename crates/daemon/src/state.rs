// SPDX-License-Identifier: MIT

//! Shared daemon context handed to every connection handler — one instance
//! per daemon process, cloned as `Arc` into each accepted connection's task.

use crate::config::DaemonConfig;
use oms_core::Clock;
use oms_engine::{CompletionVerifier, ConflictCoordinator, LifecycleCoordinator};
use oms_registry::AgentRegistry;
use oms_store::TaskStore;
use std::sync::Arc;

pub struct DaemonState {
    pub config: DaemonConfig,
    pub store: Arc<TaskStore>,
    pub registry: Arc<AgentRegistry>,
    pub lifecycle: Arc<LifecycleCoordinator>,
    pub conflicts: Arc<ConflictCoordinator>,
    pub verifier: Arc<CompletionVerifier>,
    pub clock: Arc<dyn Clock>,
}
