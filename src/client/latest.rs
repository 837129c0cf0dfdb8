// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Latest-request guard for overlapping fetches.
//!
//! When a newer load is issued while an older one is still in flight, the
//! older response must not overwrite the newer one. Every load takes an id;
//! only the holder of the latest id may apply its result.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

/// A single value fed by overlapping loads; only the latest load lands.
#[derive(Debug)]
pub struct LatestSlot<T> {
    issued: AtomicU64,
    value: Mutex<Option<(u64, T)>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self {
            issued: AtomicU64::new(0),
            value: Mutex::new(None),
        }
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply(&self, id: u64, value: T) -> bool {
        if self.issued.load(Ordering::SeqCst) != id {
            return false;
        }
        let mut slot = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some((id, value));
        true
    }

    /// Run `fetch` and store its result if no newer load started meanwhile.
    ///
    /// Returns `Ok(true)` when the result was applied and `Ok(false)` when it
    /// was discarded as stale. Errors from stale loads are discarded too.
    pub async fn load<F, E>(&self, fetch: F) -> Result<bool, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let id = self.begin();
        let outcome = fetch.await;
        if self.issued.load(Ordering::SeqCst) != id {
            debug!(request_id = id, "discarding stale response");
            return Ok(false);
        }
        Ok(self.apply(id, outcome?))
    }

    pub fn current(&self) -> Option<T>
    where
        T: Clone,
    {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, value)| value.clone())
    }
}
