// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, per-recorder FIFO queue backed by a single shared SQLite store.
//! One `QueueStore` is opened per process and shared (reference counted
//! via `Arc`) by every DR Worker; `queue_name` scopes rows to a single
//! recorder within the shared table.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use scopy_core::{Job, QueueStatus};
use tracing::warn;

use crate::error::Result;

/// A single persisted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRecord {
    pub rowid: i64,
    pub queue_name: String,
    pub job: Job,
    pub filesize: u64,
    pub status: QueueStatus,
    pub reason: Option<String>,
    pub created_at: u64,
}

/// Map of `status -> count`, as returned by [`QueueStore::stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Shared handle onto the durable queue store. Cheap to clone; all clones
/// share the same underlying connection and mutex.
#[derive(Clone)]
pub struct QueueStore {
    conn: Arc<Mutex<Connection>>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS queue_records (
    rowid        INTEGER PRIMARY KEY AUTOINCREMENT,
    queue_name   TEXT NOT NULL,
    source_host  TEXT NOT NULL,
    source_path  TEXT NOT NULL,
    dest_host    TEXT NOT NULL,
    dest_path    TEXT NOT NULL,
    command_id   TEXT NOT NULL,
    filesize     INTEGER NOT NULL DEFAULT 0,
    retry_count  INTEGER NOT NULL DEFAULT 0,
    last_try     INTEGER NOT NULL DEFAULT 0,
    status       TEXT NOT NULL,
    reason       TEXT,
    created_at   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_queue_records_name_status ON queue_records(queue_name, status);
CREATE INDEX IF NOT EXISTS idx_queue_records_created_at ON queue_records(created_at);
";

impl QueueStore {
    /// Open (creating if absent) the shared queue store at `path`, set WAL
    /// journaling with full synchronous commits and a 5s busy timeout, and
    /// run the schema migration.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// In-memory store, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn configure(conn: &Connection) -> Result<()> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Append a `pending` row. Durable before returning.
    pub fn put(&self, queue_name: &str, job: &Job) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO queue_records
                (queue_name, source_host, source_path, dest_host, dest_path,
                 command_id, retry_count, last_try, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                queue_name,
                job.source_host,
                job.source_path,
                job.dest_host,
                job.dest_path,
                job.id,
                job.tries,
                job.last_try,
                QueueStatus::Pending.as_str(),
                now(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Pop the oldest `pending` row for `queue_name` and atomically mark it
    /// `processing`. Returns `None` if the queue is empty.
    pub fn get(&self, queue_name: &str) -> Result<Option<QueueRecord>> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let row: Option<QueueRecord> = tx
            .query_row(
                "SELECT rowid, queue_name, source_host, source_path, dest_host, dest_path,
                        command_id, filesize, retry_count, last_try, status, reason, created_at
                 FROM queue_records
                 WHERE queue_name = ?1 AND status = 'pending'
                 ORDER BY rowid ASC LIMIT 1",
                params![queue_name],
                row_to_record,
            )
            .optional()?;
        if let Some(ref rec) = row {
            tx.execute(
                "UPDATE queue_records SET status = 'processing' WHERE rowid = ?1",
                params![rec.rowid],
            )?;
        }
        tx.commit()?;
        Ok(row)
    }

    /// Delete the `processing` row with the given rowid. Idempotent if no
    /// row matches (already deleted, or never existed).
    pub fn task_done(&self, rowid: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM queue_records WHERE rowid = ?1 AND status = 'processing'",
            params![rowid],
        )?;
        Ok(())
    }

    /// Append a `completed` row, independent of the pending set.
    pub fn add_completed(&self, queue_name: &str, job: &Job, filesize: u64) -> Result<i64> {
        self.add_terminal(queue_name, job, QueueStatus::Completed, filesize, None)
    }

    /// Append a `failed` row with the terminal failure reason.
    pub fn add_failed(
        &self,
        queue_name: &str,
        job: &Job,
        reason: &str,
        filesize: u64,
    ) -> Result<i64> {
        self.add_terminal(queue_name, job, QueueStatus::Failed, filesize, Some(reason))
    }

    fn add_terminal(
        &self,
        queue_name: &str,
        job: &Job,
        status: QueueStatus,
        filesize: u64,
        reason: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO queue_records
                (queue_name, source_host, source_path, dest_host, dest_path,
                 command_id, filesize, retry_count, last_try, status, reason, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                queue_name,
                job.source_host,
                job.source_path,
                job.dest_host,
                job.dest_path,
                job.id,
                filesize,
                job.tries,
                job.last_try,
                status.as_str(),
                reason,
                now(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Rows with the given status, stable ordering by `source_path`.
    pub fn get_by_status(&self, queue_name: &str, status: QueueStatus) -> Result<Vec<QueueRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT rowid, queue_name, source_host, source_path, dest_host, dest_path,
                    command_id, filesize, retry_count, last_try, status, reason, created_at
             FROM queue_records
             WHERE queue_name = ?1 AND status = ?2
             ORDER BY source_path ASC",
        )?;
        let rows = stmt
            .query_map(params![queue_name, status.as_str()], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_completed(&self, queue_name: &str) -> Result<Vec<QueueRecord>> {
        self.get_by_status(queue_name, QueueStatus::Completed)
    }

    pub fn get_failed(&self, queue_name: &str) -> Result<Vec<QueueRecord>> {
        self.get_by_status(queue_name, QueueStatus::Failed)
    }

    /// Delete all rows of `status` for `queue_name`.
    pub fn purge_by_status(&self, queue_name: &str, status: QueueStatus) -> Result<u64> {
        let conn = self.conn.lock();
        let n = conn.execute(
            "DELETE FROM queue_records WHERE queue_name = ?1 AND status = ?2",
            params![queue_name, status.as_str()],
        )?;
        Ok(n as u64)
    }

    pub fn purge_completed(&self, queue_name: &str) -> Result<u64> {
        self.purge_by_status(queue_name, QueueStatus::Completed)
    }

    pub fn purge_failed(&self, queue_name: &str) -> Result<u64> {
        self.purge_by_status(queue_name, QueueStatus::Failed)
    }

    /// Restart recovery: resets any `processing` rows for `queue_name` back
    /// to `pending`, then returns the full pending set in insertion order.
    pub fn restore_pending(&self, queue_name: &str) -> Result<Vec<QueueRecord>> {
        let conn = self.conn.lock();
        let reset = conn.execute(
            "UPDATE queue_records SET status = 'pending'
             WHERE queue_name = ?1 AND status = 'processing'",
            params![queue_name],
        )?;
        if reset > 0 {
            warn!(queue_name, reset, "reset interrupted processing rows to pending on restart");
        }
        let mut stmt = conn.prepare(
            "SELECT rowid, queue_name, source_host, source_path, dest_host, dest_path,
                    command_id, filesize, retry_count, last_try, status, reason, created_at
             FROM queue_records
             WHERE queue_name = ?1 AND status = 'pending'
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![queue_name], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Counts of rows by status for `queue_name`.
    pub fn stats(&self, queue_name: &str) -> Result<QueueStats> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM queue_records WHERE queue_name = ?1 GROUP BY status",
        )?;
        let mut stats = QueueStats::default();
        let rows = stmt.query_map(params![queue_name], |r| {
            let status: String = r.get(0)?;
            let count: i64 = r.get(1)?;
            Ok((status, count as u64))
        })?;
        for row in rows {
            let (status, count) = row?;
            match QueueStatus::parse(&status) {
                Some(QueueStatus::Pending) => stats.pending = count,
                Some(QueueStatus::Processing) => stats.processing = count,
                Some(QueueStatus::Completed) => stats.completed = count,
                Some(QueueStatus::Failed) => stats.failed = count,
                None => {}
            }
        }
        Ok(stats)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueRecord> {
    let status: String = row.get(10)?;
    Ok(QueueRecord {
        rowid: row.get(0)?,
        queue_name: row.get(1)?,
        job: Job {
            source_host: row.get(2)?,
            source_path: row.get(3)?,
            dest_host: row.get(4)?,
            dest_path: row.get(5)?,
            id: row.get(6)?,
            tries: row.get(8)?,
            last_try: row.get(9)?,
        },
        filesize: {
            let v: i64 = row.get(7)?;
            v as u64
        },
        status: QueueStatus::parse(&status).unwrap_or(QueueStatus::Pending),
        reason: row.get(11)?,
        created_at: {
            let v: i64 = row.get(12)?;
            v as u64
        },
    })
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
