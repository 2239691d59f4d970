// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job value type: an immutable descriptor of a transfer or delete.

use serde::{Deserialize, Serialize};

/// Sentinel `dest_path` marking a delete job that should wait its turn in
/// the queue like any other job.
pub const DELETE_MARKER_QUEUE: &str = "smartcopy_queue_delete_this_file";

/// Sentinel `dest_path` marking a delete job that should run immediately,
/// bypassing normal FIFO ordering (the `SRM -tNOW` wire command).
pub const DELETE_MARKER_NOW: &str = "smartcopy_now_delete_this_file";

/// Immutable descriptor of a transfer or delete. Never mutated once placed
/// in the queue; a re-queued retry is a new value with incremented `tries`
/// and updated `last_try`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Empty string means "local origin".
    pub source_host: String,
    pub source_path: String,
    /// Empty string means "local destination".
    pub dest_host: String,
    /// May be one of [`DELETE_MARKER_QUEUE`] or [`DELETE_MARKER_NOW`].
    pub dest_path: String,
    /// Caller-assigned serial id, shared across retries of the same job.
    pub id: String,
    /// Non-negative retry count.
    pub tries: u32,
    /// Unix seconds of the last attempt, 0 if never attempted.
    pub last_try: u64,
}

impl Job {
    /// Build a fresh copy job with `tries=0`.
    pub fn new_copy(
        source_host: impl Into<String>,
        source_path: impl Into<String>,
        dest_host: impl Into<String>,
        dest_path: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            source_host: source_host.into(),
            source_path: source_path.into(),
            dest_host: dest_host.into(),
            dest_path: dest_path.into(),
            id: id.into(),
            tries: 0,
            last_try: 0,
        }
    }

    /// Build a fresh delete job. `immediate` selects [`DELETE_MARKER_NOW`]
    /// over [`DELETE_MARKER_QUEUE`].
    pub fn new_delete(
        host: impl Into<String>,
        path: impl Into<String>,
        id: impl Into<String>,
        immediate: bool,
    ) -> Self {
        let marker = if immediate {
            DELETE_MARKER_NOW
        } else {
            DELETE_MARKER_QUEUE
        };
        Self {
            source_host: host.into(),
            source_path: path.into(),
            dest_host: String::new(),
            dest_path: marker.to_string(),
            id: id.into(),
            tries: 0,
            last_try: 0,
        }
    }

    /// Is this a delete job (as opposed to a copy)?
    pub fn is_delete(&self) -> bool {
        self.dest_path == DELETE_MARKER_QUEUE || self.dest_path == DELETE_MARKER_NOW
    }

    /// Is this a delete job that should bypass FIFO ordering?
    pub fn is_immediate_delete(&self) -> bool {
        self.dest_path == DELETE_MARKER_NOW
    }

    /// Is source and destination on different hosts? Cross-host jobs must
    /// acquire the remote-transfer semaphore before running.
    pub fn is_cross_host(&self) -> bool {
        !self.is_delete() && !self.source_host.is_empty() && self.source_host != self.dest_host
    }

    /// Produce the re-queued retry: same id, `tries+1`, `last_try=now`.
    pub fn retried(&self, now: u64) -> Self {
        Self {
            tries: self.tries + 1,
            last_try: now,
            ..self.clone()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Job {
    /// Test helper: a local copy job with no retries.
    pub fn test_copy(id: &str) -> Self {
        Self::new_copy("", "/a/b.dat", "", "/x/", id)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
