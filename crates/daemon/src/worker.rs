// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DR Worker: the per-recorder scheduler loop. Owns one durable queue and
//! at most one active executor; applies gating, dispatch, retry,
//! archival-aware completion, daily purge, and the failure digest.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use scopy_core::{is_archival_eligible, BoundedMap, Clock, ExecutorStatus, Job};
use scopy_executor::{Progress, SubprocessExecutor};
use scopy_storage::{QueueRecord, QueueStore};
use tracing::{debug, info, warn};

use crate::error::DaemonError;
use crate::semaphore::{RemoteTransferSemaphore, SemaphoreGuard};

/// Cap on the per-recorder `results` cache.
const RESULTS_CACHE_SIZE: usize = 512;

/// Gating/retry parameters a worker needs from [`crate::config::Config`],
/// copied out so the worker doesn't borrow the whole config.
#[derive(Debug, Clone)]
pub struct WorkerParams {
    pub max_retry: u32,
    pub wait_retry_secs: u64,
    pub bw_limit_mb: u32,
    pub unreliable_link: bool,
    pub archival_host: String,
    pub purge_size_bytes: u64,
}

/// Seam over [`SubprocessExecutor`] so worker scheduling tests don't shell
/// out to real `rsync`/`ssh`.
#[async_trait]
pub trait ExecutorHandle: Send {
    fn job(&self) -> &Job;
    fn status(&self) -> &ExecutorStatus;
    fn poll(&mut self) -> &ExecutorStatus;
    fn progress(&self) -> Progress;
    async fn pause(&mut self);
    async fn cancel(&mut self);
    fn is_complete(&self) -> bool;
    fn is_successful(&self) -> bool;
}

#[async_trait]
impl ExecutorHandle for SubprocessExecutor {
    fn job(&self) -> &Job {
        SubprocessExecutor::job(self)
    }
    fn status(&self) -> &ExecutorStatus {
        SubprocessExecutor::status(self)
    }
    fn poll(&mut self) -> &ExecutorStatus {
        SubprocessExecutor::poll(self)
    }
    fn progress(&self) -> Progress {
        SubprocessExecutor::progress(self)
    }
    async fn pause(&mut self) {
        SubprocessExecutor::pause(self).await
    }
    async fn cancel(&mut self) {
        SubprocessExecutor::cancel(self).await
    }
    fn is_complete(&self) -> bool {
        SubprocessExecutor::is_complete(self)
    }
    fn is_successful(&self) -> bool {
        SubprocessExecutor::is_successful(self)
    }
}

/// Builds a fresh executor for a job. Exists so tests can substitute a
/// fake that never shells out.
pub trait ExecutorFactory: Send + Sync {
    fn start(&self, job: Job, now_secs: u64, bw_limit_mb: u32, unreliable_link: bool) -> Box<dyn ExecutorHandle>;
}

pub struct SubprocessExecutorFactory;

impl ExecutorFactory for SubprocessExecutorFactory {
    fn start(&self, job: Job, now_secs: u64, bw_limit_mb: u32, unreliable_link: bool) -> Box<dyn ExecutorHandle> {
        Box::new(SubprocessExecutor::start(job, now_secs, bw_limit_mb, unreliable_link))
    }
}

/// Probes a source file's continued existence, deciding whether a failed
/// job is retryable. Injected so tests don't need a real filesystem or
/// ssh reachable host.
#[async_trait]
pub trait SourceProbe: Send + Sync {
    async fn file_exists(&self, host: &str, path: &str) -> bool;
}

pub struct RealSourceProbe;

#[async_trait]
impl SourceProbe for RealSourceProbe {
    async fn file_exists(&self, host: &str, path: &str) -> bool {
        scopy_executor::file_exists(host, path).await
    }
}

/// A running job paired with the bookkeeping needed to drain it: the
/// queue row it came from, and the remote-lock guard if one was acquired.
struct Active {
    executor: Box<dyn ExecutorHandle>,
    row: QueueRecord,
    _lock: Option<SemaphoreGuard>,
}

/// Per-recorder scheduler. `recorder` doubles as the queue's `queue_name`.
pub struct DrWorker<C: Clock> {
    pub recorder: String,
    queue: QueueStore,
    clock: C,
    params: WorkerParams,
    semaphore: RemoteTransferSemaphore,
    factory: Arc<dyn ExecutorFactory>,
    probe: Arc<dyn SourceProbe>,
    active: Option<Active>,
    global_inhibit: bool,
    busy: bool,
    results: BoundedMap<String, String>,
}

impl<C: Clock> DrWorker<C> {
    pub fn new(
        recorder: impl Into<String>,
        queue: QueueStore,
        clock: C,
        params: WorkerParams,
        semaphore: RemoteTransferSemaphore,
        factory: Arc<dyn ExecutorFactory>,
        probe: Arc<dyn SourceProbe>,
    ) -> Self {
        Self {
            recorder: recorder.into(),
            queue,
            clock,
            params,
            semaphore,
            factory,
            probe,
            active: None,
            global_inhibit: true,
            busy: true,
            results: BoundedMap::new(RESULTS_CACHE_SIZE),
        }
    }

    pub fn set_global_inhibit(&mut self, inhibit: bool) {
        self.global_inhibit = inhibit;
    }

    pub fn global_inhibit(&self) -> bool {
        self.global_inhibit
    }

    /// Called from the Activity Monitor callback: the sole coupling
    /// between activity tracking and worker dispatch.
    pub async fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        if busy {
            if let Some(active) = &mut self.active {
                active.executor.pause().await;
            }
        }
    }

    pub fn result_for(&self, command_id: &str) -> Option<&str> {
        self.results.get(command_id).map(String::as_str)
    }

    /// One cooperative scheduling cycle: gate, then dispatch-or-drain.
    /// Periodic maintenance (purge, digest) is driven separately, on its
    /// own daily cadence, by the Supervisor.
    pub async fn cycle(&mut self) {
        if self.global_inhibit || self.busy {
            return;
        }

        if let Some(active) = &mut self.active {
            if !active.executor.is_complete() {
                active.executor.poll();
                return;
            }
            self.drain_active().await;
        }

        self.dispatch_next().await;
    }

    async fn drain_active(&mut self) {
        let Some(active) = self.active.take() else { return };
        let successful = active.executor.is_successful();
        let job = active.executor.job().clone();

        if successful {
            self.record_success(&job, &active.row).await;
        } else {
            self.record_failure(&job, &active.row, active.executor.status()).await;
        }
        // active.lock drops here, releasing the semaphore iff it was held.
    }

    async fn record_success(&mut self, job: &Job, row: &QueueRecord) {
        if job.is_delete() {
            let _ = self.queue.task_done(row.rowid);
            self.results.insert(job.id.clone(), "complete".to_string());
            return;
        }
        if is_archival_eligible(job, &self.params.archival_host) {
            if let Err(e) = self.queue.add_completed(&self.recorder, job, row.filesize) {
                warn!(recorder = %self.recorder, error = %e, "failed to record completed row");
            }
        }
        let _ = self.queue.task_done(row.rowid);
        self.results.insert(job.id.clone(), "complete".to_string());
    }

    async fn record_failure(&mut self, job: &Job, row: &QueueRecord, status: &ExecutorStatus) {
        let reason = status.to_string();
        let source_exists = self.probe.file_exists(&job.source_host, &job.source_path).await;
        let terminal = !source_exists || job.tries + 1 >= self.params.max_retry;

        let _ = self.queue.task_done(row.rowid);
        if terminal {
            if let Err(e) = self.queue.add_failed(&self.recorder, job, &reason, row.filesize) {
                warn!(recorder = %self.recorder, error = %e, "failed to record failed row");
            }
            self.results.insert(job.id.clone(), format!("error: {reason}"));
        } else {
            let retried = job.retried(self.clock.epoch_secs());
            if let Err(e) = self.queue.put(&self.recorder, &retried) {
                warn!(recorder = %self.recorder, error = %e, "failed to re-queue job for retry");
            }
            self.results.insert(job.id.clone(), format!("error: {reason} (retrying)"));
        }
    }

    async fn dispatch_next(&mut self) {
        let Some(row) = (match self.queue.get(&self.recorder) {
            Ok(row) => row,
            Err(e) => {
                warn!(recorder = %self.recorder, error = %e, "queue store error on get");
                return;
            }
        }) else {
            return;
        };

        let job = row.job.clone();

        if self.results.get(&job.id).map(String::as_str) == Some("canceled") {
            let _ = self.queue.task_done(row.rowid);
            return;
        }

        let now = self.clock.epoch_secs();
        if job.tries > 0 && now.saturating_sub(job.last_try) < self.params.wait_retry_secs {
            let _ = self.queue.task_done(row.rowid);
            if let Err(e) = self.queue.put(&self.recorder, &job) {
                warn!(recorder = %self.recorder, error = %e, "failed to re-queue job still in cooldown");
            }
            return;
        }

        let lock = if job.is_cross_host() {
            match self.semaphore.try_acquire() {
                Some(guard) => Some(guard),
                None => {
                    debug!(recorder = %self.recorder, job = %job.id, "remote-transfer semaphore busy, re-queueing");
                    let _ = self.queue.task_done(row.rowid);
                    if let Err(e) = self.queue.put(&self.recorder, &job) {
                        warn!(recorder = %self.recorder, error = %e, "failed to re-queue contended job");
                    }
                    return;
                }
            }
        } else {
            None
        };

        let bw_limit = if lock.is_some() { self.params.bw_limit_mb } else { 0 };
        let executor = self.factory.start(job.clone(), now, bw_limit, self.params.unreliable_link);
        info!(recorder = %self.recorder, job = %job.id, "dispatched job");
        self.results.insert(job.id.clone(), format!("active/started for {}", self.recorder));
        self.active = Some(Active { executor, row, _lock: lock });
    }

    /// Inhibit dispatch and pause any in-flight executor.
    pub async fn pause(&mut self) {
        self.global_inhibit = true;
        if let Some(active) = &mut self.active {
            active.executor.pause().await;
        }
    }

    /// Lift the inhibit; the in-flight executor (if paused) resumes on the
    /// worker's next dispatch, per the Subprocess Executor's own resume
    /// semantics.
    pub fn resume(&mut self) {
        self.global_inhibit = false;
    }

    /// Enqueue a job and record the initial results entry. Callers assign
    /// `job.id`; reference-id allocation happens at the request handler.
    pub fn add_job(&mut self, job: Job) -> Result<(), DaemonError> {
        self.queue.put(&self.recorder, &job)?;
        self.results.insert(job.id.clone(), "queued".to_string());
        Ok(())
    }

    /// Mark canceled; if it's the active job, cancel the executor too.
    pub async fn cancel_job(&mut self, command_id: &str) {
        self.results.insert(command_id.to_string(), "canceled".to_string());
        if let Some(active) = &mut self.active {
            if active.executor.job().id == command_id {
                active.executor.cancel().await;
            }
        }
    }

    pub fn active_job_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.executor.job().id.as_str())
    }

    pub fn active_progress(&self) -> Option<Progress> {
        self.active.as_ref().map(|a| a.executor.progress())
    }

    pub fn active_status(&self) -> Option<&ExecutorStatus> {
        self.active.as_ref().map(|a| a.executor.status())
    }

    pub fn queue_stats(&self) -> scopy_storage::QueueStats {
        self.queue.stats(&self.recorder).unwrap_or_default()
    }

    /// Daily purge: if accumulated completed size crosses the configured
    /// threshold, attempt to delete every completed file.
    /// Deletion failures are re-recorded as completed (retried on the
    /// next purge cycle).
    pub async fn run_purge(&mut self, delete: &dyn DeleteRunner) {
        let completed = match self.queue.get_completed(&self.recorder) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(recorder = %self.recorder, error = %e, "failed to read completed rows for purge");
                return;
            }
        };
        let total: u64 = completed.iter().map(|r| r.filesize).sum();
        if total < self.params.purge_size_bytes {
            return;
        }

        info!(recorder = %self.recorder, total_bytes = total, "purge threshold crossed");
        if let Err(e) = self.queue.purge_completed(&self.recorder) {
            warn!(recorder = %self.recorder, error = %e, "failed to clear completed rows before purge");
            return;
        }

        for row in completed {
            let ok = delete.delete(&row.job.dest_host, &row.job.dest_path).await;
            if !ok {
                if let Err(e) = self.queue.add_completed(&self.recorder, &row.job, row.filesize) {
                    warn!(recorder = %self.recorder, error = %e, "failed to re-record completed row after failed delete");
                }
            }
        }
    }

    /// Everything currently in the `failed` set, for the caller to mail
    /// and then purge.
    pub fn drain_failed_for_digest(&mut self) -> Vec<QueueRecord> {
        let rows = self.queue.get_failed(&self.recorder).unwrap_or_default();
        if !rows.is_empty() {
            let _ = self.queue.purge_failed(&self.recorder);
        }
        rows
    }
}

/// Deletes a purged file, locally or over ssh (wraps
/// [`scopy_executor::build_delete_command`]). A trait seam so purge tests
/// don't shell out.
#[async_trait]
pub trait DeleteRunner: Send + Sync {
    async fn delete(&self, host: &str, path: &str) -> bool;
}

pub struct RealDeleteRunner;

#[async_trait]
impl DeleteRunner for RealDeleteRunner {
    async fn delete(&self, host: &str, path: &str) -> bool {
        let job = Job::new_delete(host, path, "purge", false);
        let spec = scopy_executor::build_delete_command(&job);
        match tokio::process::Command::new(&spec.program).args(&spec.args).status().await {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(host, path, error = %e, "purge delete failed to spawn");
                false
            }
        }
    }
}

/// Per-recorder worker map, for the Supervisor's own bookkeeping.
pub type WorkerMap<C> = HashMap<String, DrWorker<C>>;

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
