// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The interruptible subprocess executor: runs exactly one of
//! {remote copy, local copy, remote delete, local delete} as a child
//! process, streams progress, and supports pause/resume/cancel.

use std::process::Stdio;
use std::sync::Arc;

use parking_lot::Mutex;
use scopy_core::{ExecutorStatus, Job};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::command::{build_copy_command, build_delete_command, build_truncate_command, CommandSpec};
use crate::progress::{parse_latest, Progress};

/// Minimum cooldown between retries of the same job.
pub const RETRY_COOLDOWN_SECS: u64 = 24 * 3600;

/// Output tail kept per stream, to bound memory on long-running transfers.
const TAIL_CAP_BYTES: usize = 16 * 1024;

struct Running {
    child: Child,
    stdout: Arc<Mutex<String>>,
    stderr: Arc<Mutex<String>>,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

impl Running {
    fn abort(self) {
        self.stdout_task.abort();
        self.stderr_task.abort();
    }
}

/// Runs a single copy or delete job in a child process and exposes its
/// live status. One instance lives per DR Worker, for the duration of one
/// `get()`-to-next-iteration cycle.
pub struct SubprocessExecutor {
    job: Job,
    bw_limit_mb: u32,
    unreliable_link: bool,
    status: ExecutorStatus,
    running: Option<Running>,
}

impl SubprocessExecutor {
    /// Start a job. A retry attempted before its cooldown elapses never
    /// spawns a process and enters `error: too soon to retry` directly.
    pub fn start(job: Job, now_secs: u64, bw_limit_mb: u32, unreliable_link: bool) -> Self {
        let mut exec = Self {
            job,
            bw_limit_mb,
            unreliable_link,
            status: ExecutorStatus::NotStarted,
            running: None,
        };
        if exec.job.tries > 0
            && now_secs.saturating_sub(exec.job.last_try) < RETRY_COOLDOWN_SECS
        {
            exec.status = ExecutorStatus::too_soon_to_retry();
        } else {
            exec.spawn();
        }
        exec
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn status(&self) -> &ExecutorStatus {
        &self.status
    }

    /// The rsync argv this executor is (or was) running, for logging.
    fn command(&self) -> CommandSpec {
        if self.job.is_delete() {
            build_delete_command(&self.job)
        } else {
            build_copy_command(&self.job, self.bw_limit_mb)
        }
    }

    fn spawn(&mut self) {
        if self.job.is_delete() && self.job.dest_path == scopy_core::DELETE_MARKER_QUEUE {
            // Queued deletes are satisfied just by being dequeued; only
            // immediate deletes actually spawn `rm`.
            self.status = ExecutorStatus::Complete;
            return;
        }

        run_truncate_precondition(&self.job, self.unreliable_link);

        let spec = self.command();
        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        match cmd.spawn() {
            Ok(mut child) => {
                debug!(cmd = %spec.display(), pid = ?child.id(), "launched executor subprocess");
                let stdout = Arc::new(Mutex::new(String::new()));
                let stderr = Arc::new(Mutex::new(String::new()));

                let stdout_pipe = child.stdout.take();
                let stdout_task = spawn_pump(stdout_pipe, stdout.clone());
                let stderr_pipe = child.stderr.take();
                let stderr_task = spawn_pump(stderr_pipe, stderr.clone());

                self.running = Some(Running { child, stdout, stderr, stdout_task, stderr_task });
                self.status = ExecutorStatus::Active;
            }
            Err(e) => {
                warn!(cmd = %spec.display(), error = %e, "failed to spawn executor subprocess");
                self.status = ExecutorStatus::Error(e.to_string());
            }
        }
    }

    /// Non-blocking: reap the child if it has exited, updating status from
    /// its exit code. Safe to call every worker tick.
    pub fn poll(&mut self) -> &ExecutorStatus {
        if let Some(running) = &mut self.running {
            match running.child.try_wait() {
                Ok(Some(exit)) => {
                    let stderr_tail = running.stderr.lock().clone();
                    self.status = if exit.success() {
                        ExecutorStatus::Complete
                    } else if exit.code().is_none() {
                        // Terminated by signal (e.g. our own `pause`/`cancel`
                        // raced the poll): treat as paused, matching the
                        // source's "exit<0 -> paused".
                        ExecutorStatus::Paused
                    } else {
                        ExecutorStatus::Error(stderr_tail.trim().to_string())
                    };
                    self.running.take().map(Running::abort);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "error polling executor subprocess"),
            }
        }
        &self.status
    }

    /// Kill the child and join it. Safe to call whether or not a child is
    /// currently running.
    pub async fn pause(&mut self) {
        if let Some(mut running) = self.running.take() {
            let _ = running.child.start_kill();
            let _ = running.child.wait().await;
            running.abort();
            self.status = ExecutorStatus::Paused;
        }
    }

    /// Re-spawn the same command. rsync's `--append`/`--append-verify`
    /// makes this safe to resume partial transfers.
    pub fn resume(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }
        self.spawn();
        true
    }

    /// Pause then mark canceled; no `completed`/`failed` row should follow.
    pub async fn cancel(&mut self) {
        self.pause().await;
        self.status = ExecutorStatus::Canceled;
    }

    pub fn is_complete(&self) -> bool {
        self.running.is_none() && !matches!(self.status, ExecutorStatus::Paused | ExecutorStatus::NotStarted)
    }

    pub fn is_successful(&self) -> bool {
        self.is_complete() && matches!(self.status, ExecutorStatus::Complete)
    }

    pub fn is_failed(&self) -> bool {
        self.is_complete() && matches!(self.status, ExecutorStatus::Error(_))
    }

    /// Current progress snapshot, parsed from the accumulated stdout tail.
    pub fn progress(&self) -> Progress {
        match &self.running {
            Some(running) => {
                let buf = running.stdout.lock();
                parse_latest(&buf).unwrap_or_else(Progress::unstarted)
            }
            None => Progress::unstarted(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

fn run_truncate_precondition(job: &Job, unreliable_link: bool) {
    let Some(spec) = build_truncate_command(job, unreliable_link) else {
        return;
    };
    match std::process::Command::new(&spec.program).args(&spec.args).output() {
        Ok(out) => {
            debug!(
                cmd = %spec.display(),
                status = ?out.status.code(),
                "ran unreliable-link truncate precondition"
            );
        }
        Err(e) => {
            warn!(cmd = %spec.display(), error = %e, "failed to run truncate precondition");
        }
    }
}

fn spawn_pump<R>(pipe: Option<R>, sink: Arc<Mutex<String>>) -> JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(pipe) = pipe else { return };
        let mut lines = BufReader::new(pipe).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let mut buf = sink.lock();
                    buf.push_str(&line);
                    buf.push('\n');
                    let len = buf.len();
                    if len > TAIL_CAP_BYTES {
                        let drop = len - TAIL_CAP_BYTES;
                        buf.drain(..drop);
                    }
                }
                Ok(None) => break,
                Err(_) => break,
            }
        }
    })
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
