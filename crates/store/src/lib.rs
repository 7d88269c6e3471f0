// SPDX-License-Identifier: MIT

//! Per-issue JSON file persistence for the orchestration service (§4.1,
//! §6 "task store files").

pub mod error;
pub mod layout;
mod persist;
mod store;

pub use error::{StoreError, StoreResult};
pub use layout::StoreLayout;
pub use store::{BatchItem, CreateOpts, DeleteOutcome, QueryFilter, TaskStore, UpdatePatch};
