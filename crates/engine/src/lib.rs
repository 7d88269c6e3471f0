// SPDX-License-Identifier: MIT

//! Scheduling, lifecycle, conflict resolution, completion verification, and
//! the extension tool surface's guardrails (§4.3-§4.8).

pub mod bash_guard;
pub mod conflict;
pub mod error;
pub mod lifecycle;
pub mod roles;
pub mod scheduler;
pub mod supervisor;
pub mod verifier;

pub use bash_guard::{classify_bash_command, BashVerdict};
pub use conflict::{Complaint, ConflictCoordinator};
pub use error::EngineError;
pub use lifecycle::{LifecycleCoordinator, PipelineStage};
pub use scheduler::{
    compute_label_conflicts, find_tasks_unblocked_by, get_in_progress_tasks_without_agent, get_next_tasks, natural_cmp, try_claim,
};
pub use roles::is_action_allowed;
pub use supervisor::{ProcessSupervisor, Signal, SpawnedAgent};
pub use verifier::{classify_completion, CompletionClass, CompletionRejection, CompletionVerifier};

#[cfg(any(test, feature = "test-support"))]
pub use supervisor::FakeSupervisor;
