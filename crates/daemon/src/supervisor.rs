// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: owns every DR Worker, the Activity Monitor, and the
//! process-wide lifecycle status. Exposes the control surface the Request
//! Handler dispatches onto and the MIB report keys it answers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use parking_lot::Mutex as SyncMutex;
use scopy_core::{Clock, Job, SupervisorStatus};
use scopy_storage::QueueStore;
use scopy_wire::{MibKey, RecorderTarget};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::activity_monitor::{self, ActivityMonitor};
use crate::config::Config;
use crate::error::DaemonError;
use crate::mail::MailDigest;
use crate::worker::{DeleteRunner, DrWorker, ExecutorFactory, RealDeleteRunner, SourceProbe, WorkerParams};

/// Cycle time for each DR Worker's cooperative loop.
const WORKER_CYCLE: Duration = Duration::from_secs(5);

/// The mutual-exclusion gate on `INI`/`SHT`: a new one is rejected while
/// another is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveProcess {
    Ini,
    Sht,
}

/// Tracks whether a once-per-calendar-day maintenance task has already
/// fired today, so a 5s cooperative loop can anchor it at a fixed UTC hour
/// without a separate scheduler.
#[derive(Default)]
struct DailyAnchor {
    last_fired: Option<NaiveDate>,
}

impl DailyAnchor {
    fn should_fire(&mut self, now: DateTime<Utc>, hour: u32) -> bool {
        let today = now.date_naive();
        if now.hour() >= hour && self.last_fired != Some(today) {
            self.last_fired = Some(today);
            true
        } else {
            false
        }
    }
}

/// One DR Worker plus the background task driving its cooperative loop.
struct WorkerHandle<C: Clock> {
    worker: Arc<AsyncMutex<DrWorker<C>>>,
    task: JoinHandle<()>,
}

/// Owns the DR Worker map, the Activity Monitor, and global supervisor
/// state.
pub struct Supervisor<C: Clock + 'static> {
    recorders: Vec<String>,
    workers: SyncMutex<HashMap<String, WorkerHandle<C>>>,
    queue: QueueStore,
    clock: C,
    config: Config,
    /// Single process-wide semaphore, cloned into every worker: a binary
    /// lock shared across all DR Workers, not one per recorder.
    semaphore: crate::semaphore::RemoteTransferSemaphore,
    factory: Arc<dyn ExecutorFactory>,
    probe: Arc<dyn SourceProbe>,
    delete_runner: Arc<dyn DeleteRunner>,
    mail: Option<Arc<MailDigest>>,
    monitor_task: SyncMutex<Option<JoinHandle<()>>>,
    status: SyncMutex<SupervisorStatus>,
    info: SyncMutex<String>,
    last_log: SyncMutex<String>,
    active_process: SyncMutex<Option<ActiveProcess>>,
}

impl<C: Clock + 'static> Supervisor<C> {
    pub fn new(
        config: Config,
        queue: QueueStore,
        clock: C,
        factory: Arc<dyn ExecutorFactory>,
        probe: Arc<dyn SourceProbe>,
        mail: Option<Arc<MailDigest>>,
    ) -> Self {
        Self {
            recorders: config.recorders.clone(),
            workers: SyncMutex::new(HashMap::new()),
            queue,
            clock,
            config,
            semaphore: crate::semaphore::RemoteTransferSemaphore::new(),
            factory,
            probe,
            delete_runner: Arc::new(RealDeleteRunner),
            mail,
            monitor_task: SyncMutex::new(None),
            status: SyncMutex::new(SupervisorStatus::Shutdown),
            info: SyncMutex::new(String::new()),
            last_log: SyncMutex::new(String::new()),
            active_process: SyncMutex::new(None),
        }
    }

    fn worker_params(&self) -> WorkerParams {
        WorkerParams {
            max_retry: self.config.max_retry,
            wait_retry_secs: self.config.wait_retry_secs(),
            bw_limit_mb: self.config.bw_limit,
            unreliable_link: self.config.unreliable_link,
            archival_host: self.config.archival_host.clone(),
            purge_size_bytes: self.config.purge_size_bytes(),
        }
    }

    fn begin_active_process(&self, which: ActiveProcess) -> Result<(), DaemonError> {
        let mut guard = self.active_process.lock();
        if guard.is_some() {
            return Err(DaemonError::BusyState);
        }
        *guard = Some(which);
        Ok(())
    }

    fn end_active_process(&self) {
        *self.active_process.lock() = None;
    }

    pub fn status(&self) -> SupervisorStatus {
        *self.status.lock()
    }

    pub fn info(&self) -> String {
        self.info.lock().clone()
    }

    pub fn last_log(&self) -> String {
        self.last_log.lock().clone()
    }

    fn set_last_log(&self, msg: impl Into<String>) {
        *self.last_log.lock() = msg.into();
    }

    fn require_normal(&self) -> Result<(), DaemonError> {
        if self.status() == SupervisorStatus::Normal {
            Ok(())
        } else {
            Err(DaemonError::NotInitialized)
        }
    }

    /// (Re)creates workers, restores interrupted rows from a prior crash
    /// via `restore_pending`, starts the Activity Monitor, and spawns each
    /// worker's cooperative loop. Every worker starts `globalInhibit=true`
    /// until an explicit `RES` resumes it.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), DaemonError> {
        self.begin_active_process(ActiveProcess::Ini)?;
        *self.status.lock() = SupervisorStatus::Booting;

        let mut fresh = HashMap::new();
        for recorder in &self.recorders {
            match self.queue.restore_pending(recorder) {
                Ok(rows) => info!(recorder, pending = rows.len(), "restored pending rows on boot"),
                Err(e) => warn!(recorder, error = %e, "failed to restore pending rows on boot"),
            }

            let worker = DrWorker::new(
                recorder.clone(),
                self.queue.clone(),
                self.clock.clone(),
                self.worker_params(),
                self.semaphore.clone(),
                self.factory.clone(),
                self.probe.clone(),
            );
            let worker = Arc::new(AsyncMutex::new(worker));
            let task = self.spawn_worker_loop(recorder.clone(), worker.clone());
            fresh.insert(recorder.clone(), WorkerHandle { worker, task });
        }
        *self.workers.lock() = fresh;

        let monitor = ActivityMonitor::new(self.recorders.iter().cloned());
        let path = self.config.activity_log_path.clone();
        let this = self.clone();
        let handle = tokio::spawn(async move {
            activity_monitor::run(&path, monitor, move |recorder, busy| {
                this.on_activity_change(recorder, busy);
            })
            .await;
        });
        *self.monitor_task.lock() = Some(handle);

        *self.status.lock() = SupervisorStatus::Normal;
        self.set_last_log("initialized");
        self.end_active_process();
        Ok(())
    }

    fn on_activity_change(&self, recorder: &str, busy: bool) {
        let Some(worker) = self.worker_handle(recorder) else { return };
        // fire-and-forget: the worker's own gate (`cycle`'s `busy ||
        // globalInhibit` check) re-derives dispatch eligibility next tick,
        // so this just needs to land before that tick observes it.
        tokio::spawn(async move {
            worker.lock().await.set_busy(busy).await;
        });
    }

    fn spawn_worker_loop(&self, recorder: String, worker: Arc<AsyncMutex<DrWorker<C>>>) -> JoinHandle<()> {
        let mail = self.mail.clone();
        let email_to = self.config.email.username.clone();
        let delete_runner = self.delete_runner.clone();
        tokio::spawn(async move {
            let mut purge_anchor = DailyAnchor::default();
            let mut digest_anchor = DailyAnchor::default();
            let mut ticker = tokio::time::interval(WORKER_CYCLE);
            loop {
                ticker.tick().await;
                let now = Utc::now();
                let mut w = worker.lock().await;
                w.cycle().await;

                if purge_anchor.should_fire(now, 18) {
                    w.run_purge(delete_runner.as_ref()).await;
                }

                if digest_anchor.should_fire(now, 22) {
                    let failed = w.drain_failed_for_digest();
                    if !failed.is_empty() {
                        if let Some(mail) = &mail {
                            if let Err(e) = mail.send_digest(&recorder, &failed, &email_to).await {
                                warn!(recorder, error = %e, "failed to send failure digest");
                            }
                        } else {
                            warn!(recorder, count = failed.len(), "failure digest skipped: no mail transport configured");
                        }
                    }
                }
            }
        })
    }

    /// Pauses every worker, stops the Activity Monitor, and tears down the
    /// per-worker background tasks.
    pub async fn shutdown(self: &Arc<Self>) -> Result<(), DaemonError> {
        self.begin_active_process(ActiveProcess::Sht)?;

        let handles: Vec<_> = {
            let workers = self.workers.lock();
            workers.values().map(|h| h.worker.clone()).collect()
        };
        for worker in &handles {
            worker.lock().await.pause().await;
        }

        if let Some(handle) = self.monitor_task.lock().take() {
            handle.abort();
        }
        {
            let mut workers = self.workers.lock();
            for (_, handle) in workers.drain() {
                handle.task.abort();
            }
        }

        *self.status.lock() = SupervisorStatus::Shutdown;
        self.set_last_log("System has been shut down");
        self.end_active_process();
        Ok(())
    }

    fn worker_handle(&self, recorder: &str) -> Option<Arc<AsyncMutex<DrWorker<C>>>> {
        self.workers.lock().get(recorder).map(|h| h.worker.clone())
    }

    fn require_worker(&self, recorder: &str) -> Result<Arc<AsyncMutex<DrWorker<C>>>, DaemonError> {
        self.worker_handle(recorder)
            .ok_or_else(|| DaemonError::Protocol(format!("unknown recorder {recorder}")))
    }

    /// Enqueue a copy job under the caller-assigned reference id.
    pub async fn add_copy(
        &self,
        recorder: &str,
        source_host: &str,
        source_path: &str,
        dest_host: &str,
        dest_path: &str,
        id: &str,
    ) -> Result<(), DaemonError> {
        self.require_normal()?;
        let worker = self.require_worker(recorder)?;
        let job = Job::new_copy(source_host, source_path, dest_host, dest_path, id);
        worker.lock().await.add_job(job)
    }

    /// Enqueue a delete job under the caller-assigned reference id.
    pub async fn add_delete(
        &self,
        recorder: &str,
        path: &str,
        immediate: bool,
        id: &str,
    ) -> Result<(), DaemonError> {
        self.require_normal()?;
        let worker = self.require_worker(recorder)?;
        let job = Job::new_delete(recorder, path, id, immediate);
        worker.lock().await.add_job(job)
    }

    /// The wire protocol cancels by reference id alone, so every worker is
    /// asked (idempotent, and cheap since it's just a results-cache write
    /// plus an optional executor cancel).
    pub async fn cancel(&self, id: &str) -> Result<(), DaemonError> {
        self.require_normal()?;
        let handles: Vec<_> = {
            let workers = self.workers.lock();
            workers.values().map(|h| h.worker.clone()).collect()
        };
        for worker in handles {
            worker.lock().await.cancel_job(id).await;
        }
        Ok(())
    }

    async fn for_target(
        &self,
        target: &RecorderTarget,
        f: impl Fn(Arc<AsyncMutex<DrWorker<C>>>) -> Result<(), DaemonError>,
    ) -> Result<(), DaemonError> {
        match target {
            RecorderTarget::All => {
                let handles: Vec<_> = {
                    let workers = self.workers.lock();
                    workers.values().map(|h| h.worker.clone()).collect()
                };
                for worker in handles {
                    f(worker)?;
                }
                Ok(())
            }
            RecorderTarget::One(recorder) => f(self.require_worker(recorder)?),
        }
    }

    /// Inhibit dispatch for `target` (wire command `PAU`).
    pub async fn pause(&self, target: &RecorderTarget) -> Result<(), DaemonError> {
        self.require_normal()?;
        let handles: Vec<_> = match target {
            RecorderTarget::All => {
                let workers = self.workers.lock();
                workers.values().map(|h| h.worker.clone()).collect()
            }
            RecorderTarget::One(recorder) => vec![self.require_worker(recorder)?],
        };
        for worker in handles {
            worker.lock().await.pause().await;
        }
        Ok(())
    }

    /// Lift the inhibit for `target` (wire command `RES`).
    pub async fn resume(&self, target: &RecorderTarget) -> Result<(), DaemonError> {
        self.require_normal()?;
        self.for_target(target, |worker| {
            // `resume()` is synchronous; the blocking `try_lock` here never
            // contends in practice since `for_target` is the sole caller
            // and holds no other lock on `worker` at this point.
            let mut guard = worker.try_lock().map_err(|_| DaemonError::BusyState)?;
            guard.resume();
            Ok(())
        })
        .await
    }

    /// Answers one `RPT` MIB key.
    pub async fn report(&self, key: &MibKey) -> Result<String, DaemonError> {
        match key {
            MibKey::Summary => Ok(self.status().to_string()),
            MibKey::Info => Ok(self.info()),
            MibKey::LastLog => Ok(self.last_log()),
            MibKey::Subsystem => Ok(self.config.subsystem_name.clone()),
            MibKey::SerialNo => Ok("1".to_string()),
            MibKey::Version => Ok(env!("CARGO_PKG_VERSION").to_string()),
            MibKey::ObsStatus(dr) => {
                let worker = self.require_worker(dr)?;
                let busy = worker.lock().await.global_inhibit();
                Ok(if busy { "INHIBITED".to_string() } else { "NORMAL".to_string() })
            }
            MibKey::QueueSize(dr) => {
                self.require_worker(dr)?;
                let stats = self.queue.stats(dr)?;
                Ok((stats.pending + stats.processing).to_string())
            }
            MibKey::QueueStatus(dr) => {
                let worker = self.require_worker(dr)?;
                let w = worker.lock().await;
                Ok(if w.global_inhibit() { "paused".to_string() } else { "running".to_string() })
            }
            MibKey::QueueStats(dr) => {
                self.require_worker(dr)?;
                let stats = self.queue.stats(dr)?;
                Ok(format!(
                    "pending={} processing={} completed={} failed={}",
                    stats.pending, stats.processing, stats.completed, stats.failed
                ))
            }
            MibKey::QueueEntry(id) => self.find_result(id).await.ok_or_else(|| {
                DaemonError::Protocol(format!("unknown queue entry {id}"))
            }),
            MibKey::ActiveId(dr) => {
                let worker = self.require_worker(dr)?;
                Ok(worker.lock().await.active_job_id().unwrap_or("").to_string())
            }
            MibKey::ActiveStatus(dr) => {
                let worker = self.require_worker(dr)?;
                Ok(worker
                    .lock()
                    .await
                    .active_status()
                    .map(|s| s.to_string())
                    .unwrap_or_default())
            }
            MibKey::ActiveBytes(dr) => {
                let worker = self.require_worker(dr)?;
                Ok(worker.lock().await.active_progress().map(|p| p.transferred).unwrap_or_else(|| "0".to_string()))
            }
            MibKey::ActiveProgress(dr) => {
                let worker = self.require_worker(dr)?;
                Ok(worker.lock().await.active_progress().map(|p| p.percent).unwrap_or_else(|| "0%".to_string()))
            }
            MibKey::ActiveSpeed(dr) => {
                let worker = self.require_worker(dr)?;
                Ok(worker
                    .lock()
                    .await
                    .active_progress()
                    .map(|p| p.speed)
                    .unwrap_or_else(|| "0.00kB/s".to_string()))
            }
            MibKey::ActiveRemaining(dr) => {
                let worker = self.require_worker(dr)?;
                Ok(worker
                    .lock()
                    .await
                    .active_progress()
                    .map(|p| p.remaining)
                    .unwrap_or_else(|| "99:59:59".to_string()))
            }
        }
    }

    async fn find_result(&self, id: &str) -> Option<String> {
        let handles: Vec<_> = {
            let workers = self.workers.lock();
            workers.values().map(|h| h.worker.clone()).collect()
        };
        for worker in handles {
            let w = worker.lock().await;
            if let Some(result) = w.result_for(id) {
                return Some(result.to_string());
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
