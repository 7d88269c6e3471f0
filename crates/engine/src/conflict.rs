// SPDX-License-Identifier: MIT

//! The conflict coordinator (§4.6): tracks which task currently holds a
//! contested file, lets other tasks lodge (and withdraw) complaints against
//! the holder, and wakes waiters once the file is released.

use crate::error::EngineError;
use oms_core::{Clock, IssueId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct Complaint {
    pub complainant: IssueId,
    pub reason: String,
    pub at_ms: u64,
}

struct Contest {
    holder: IssueId,
    complaints: Vec<Complaint>,
}

pub struct ConflictCoordinator {
    clock: Arc<dyn Clock>,
    contested: Mutex<HashMap<String, Contest>>,
    waiters: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ConflictCoordinator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            contested: Mutex::new(HashMap::new()),
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Claims `file` for `task_id`. Succeeds immediately if unheld or
    /// already held by the same task; otherwise reports who holds it.
    pub fn claim_file(&self, file: &str, task_id: &str) -> Result<(), EngineError> {
        let mut contested = self.contested.lock();
        match contested.get(file) {
            Some(entry) if entry.holder.as_str() != task_id => {
                Err(EngineError::FileContested(format!("{file} held by {}", entry.holder)))
            }
            _ => {
                contested.insert(
                    file.to_string(),
                    Contest {
                        holder: IssueId::new(task_id),
                        complaints: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    /// Releases `file` if `task_id` is its current holder, waking anyone
    /// waiting on [`Self::wait_for_release`].
    pub fn release_file(&self, file: &str, task_id: &str) {
        let mut contested = self.contested.lock();
        if contested.get(file).map(|e| e.holder.as_str() == task_id).unwrap_or(false) {
            contested.remove(file);
        }
        drop(contested);
        if let Some(notify) = self.waiters.lock().get(file) {
            notify.notify_waiters();
        }
    }

    pub fn complain(&self, file: &str, complainant: &str, reason: &str) -> Result<(), EngineError> {
        let mut contested = self.contested.lock();
        let entry = contested
            .get_mut(file)
            .ok_or_else(|| EngineError::FileContested(format!("{file} is not currently held")))?;
        entry.complaints.push(Complaint {
            complainant: IssueId::new(complainant),
            reason: reason.to_string(),
            at_ms: self.clock.epoch_ms(),
        });
        Ok(())
    }

    pub fn revoke_complaint(&self, file: &str, complainant: &str) {
        if let Some(entry) = self.contested.lock().get_mut(file) {
            entry.complaints.retain(|c| c.complainant.as_str() != complainant);
        }
    }

    /// Revokes every complaint lodged by `complainant` across all contested
    /// files, for the `revoke_complaint` verb's no-`files` form.
    pub fn revoke_all(&self, complainant: &str) {
        for entry in self.contested.lock().values_mut() {
            entry.complaints.retain(|c| c.complainant.as_str() != complainant);
        }
    }

    pub fn complaints_for(&self, file: &str) -> Vec<Complaint> {
        self.contested
            .lock()
            .get(file)
            .map(|e| e.complaints.clone())
            .unwrap_or_default()
    }

    pub fn holder_of(&self, file: &str) -> Option<IssueId> {
        self.contested.lock().get(file).map(|e| e.holder.clone())
    }

    /// Waits until `file` is released. Callers must re-check contention
    /// after waking, since another task may have claimed it first.
    pub async fn wait_for_release(&self, file: &str) {
        let notify = self
            .waiters
            .lock()
            .entry(file.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone();
        notify.notified().await;
    }
}

#[cfg(test)]
#[path = "conflict_tests.rs"]
mod tests;
