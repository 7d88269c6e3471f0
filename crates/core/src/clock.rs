// SPDX-License-Identifier: MIT

//! Clock abstraction for testable time handling.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A clock that provides the current time, abstracted so tests can control it.
pub trait Clock: Send + Sync {
    fn epoch_ms(&self) -> u64;

    /// Current time formatted as ISO-8601 (RFC 3339), matching the on-disk
    /// `created_at`/`updated_at` format required by the data model.
    fn now_iso8601(&self) -> String {
        let millis = self.epoch_ms() as i64;
        DateTime::<Utc>::from_timestamp_millis(millis)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
            .to_rfc3339()
    }
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FixedClock {
    epoch_ms: Arc<Mutex<u64>>,
}

impl FixedClock {
    pub fn new(epoch_ms: u64) -> Self {
        Self {
            epoch_ms: Arc::new(Mutex::new(epoch_ms)),
        }
    }

    pub fn advance_ms(&self, delta: u64) {
        *self.epoch_ms.lock() += delta;
    }

    pub fn set_epoch_ms(&self, ms: u64) {
        *self.epoch_ms.lock() = ms;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::new(1_700_000_000_000)
    }
}

impl Clock for FixedClock {
    fn epoch_ms(&self) -> u64 {
        *self.epoch_ms.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
