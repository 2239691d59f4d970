// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-transfer semaphore: a binary, process-wide lock serializing
//! cross-host transfers. No FIFO fairness is required; a worker that
//! fails to acquire re-queues its job instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable handle to the single process-wide cross-host transfer slot.
#[derive(Clone, Default)]
pub struct RemoteTransferSemaphore {
    held: Arc<AtomicBool>,
}

/// RAII guard releasing the semaphore on drop, so "release iff held" is
/// structural rather than tracked by a flag a caller could forget to
/// check.
pub struct SemaphoreGuard {
    held: Arc<AtomicBool>,
}

impl Drop for SemaphoreGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

impl RemoteTransferSemaphore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking acquire. `None` means another cross-host transfer is
    /// already running somewhere in the process; the caller should
    /// re-queue its job at the tail and try again next cycle.
    pub fn try_acquire(&self) -> Option<SemaphoreGuard> {
        self.held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| SemaphoreGuard { held: self.held.clone() })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_guard_lives() {
        let sem = RemoteTransferSemaphore::new();
        let first = sem.try_acquire();
        assert!(first.is_some());
        assert!(sem.try_acquire().is_none());
    }

    #[test]
    fn dropping_the_guard_releases_the_slot() {
        let sem = RemoteTransferSemaphore::new();
        {
            let _guard = sem.try_acquire().unwrap();
            assert!(sem.is_held());
        }
        assert!(!sem.is_held());
        assert!(sem.try_acquire().is_some());
    }

    #[test]
    fn cloned_handles_share_the_same_slot() {
        let sem = RemoteTransferSemaphore::new();
        let clone = sem.clone();
        let _guard = sem.try_acquire().unwrap();
        assert!(clone.try_acquire().is_none());
    }
}
