// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use scopy_core::Job;

fn store() -> QueueStore {
    QueueStore::open_in_memory().unwrap()
}

#[test]
fn put_then_get_returns_fifo_order() {
    let s = store();
    s.put("DR1", &Job::new_copy("", "/a", "", "/x/a", "1")).unwrap();
    s.put("DR1", &Job::new_copy("", "/b", "", "/x/b", "2")).unwrap();
    s.put("DR1", &Job::new_copy("", "/c", "", "/x/c", "3")).unwrap();

    let first = s.get("DR1").unwrap().unwrap();
    assert_eq!(first.job.id, "1");
    assert_eq!(first.status, QueueStatus::Processing);

    let second = s.get("DR1").unwrap().unwrap();
    assert_eq!(second.job.id, "2");
}

#[test]
fn queues_are_isolated_by_name() {
    let s = store();
    s.put("DR1", &Job::new_copy("", "/a", "", "/x/a", "1")).unwrap();
    assert!(s.get("DR2").unwrap().is_none());
    assert!(s.get("DR1").unwrap().is_some());
}

#[test]
fn task_done_removes_the_processing_row() {
    let s = store();
    s.put("DR1", &Job::new_copy("", "/a", "", "/x/a", "1")).unwrap();
    let rec = s.get("DR1").unwrap().unwrap();
    s.task_done(rec.rowid).unwrap();

    let stats = s.stats("DR1").unwrap();
    assert_eq!(stats.processing, 0);
    assert_eq!(stats.pending, 0);
}

#[test]
fn task_done_is_idempotent() {
    let s = store();
    s.put("DR1", &Job::new_copy("", "/a", "", "/x/a", "1")).unwrap();
    let rec = s.get("DR1").unwrap().unwrap();
    s.task_done(rec.rowid).unwrap();
    s.task_done(rec.rowid).unwrap();
}

#[test]
fn completed_and_failed_are_independent_of_pending() {
    let s = store();
    let job = Job::new_copy("", "/a", "", "/x/a", "1");
    s.add_completed("DR1", &job, 1024).unwrap();
    s.add_failed("DR1", &job, "exit 1", 0).unwrap();

    assert_eq!(s.get_completed("DR1").unwrap().len(), 1);
    let failed = s.get_failed("DR1").unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].reason.as_deref(), Some("exit 1"));

    let stats = s.stats("DR1").unwrap();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
}

#[test]
fn purge_clears_only_the_requested_status() {
    let s = store();
    let job = Job::new_copy("", "/a", "", "/x/a", "1");
    s.add_completed("DR1", &job, 1).unwrap();
    s.add_failed("DR1", &job, "boom", 1).unwrap();

    let purged = s.purge_completed("DR1").unwrap();
    assert_eq!(purged, 1);
    assert_eq!(s.get_completed("DR1").unwrap().len(), 0);
    assert_eq!(s.get_failed("DR1").unwrap().len(), 1);
}

#[test]
fn restore_pending_resets_processing_rows() {
    let s = store();
    s.put("DR1", &Job::new_copy("", "/a", "", "/x/a", "1")).unwrap();
    s.put("DR1", &Job::new_copy("", "/b", "", "/x/b", "2")).unwrap();
    s.put("DR1", &Job::new_copy("", "/c", "", "/x/c", "3")).unwrap();

    // Simulate a crash mid-processing: one row taken, process dies before task_done.
    let _taken = s.get("DR1").unwrap().unwrap();

    let restored = s.restore_pending("DR1").unwrap();
    assert_eq!(restored.len(), 3);
    assert_eq!(restored[0].job.id, "1");
    assert_eq!(restored[1].job.id, "2");
    assert_eq!(restored[2].job.id, "3");
    assert!(restored.iter().all(|r| r.status == QueueStatus::Pending));
}

#[test]
fn stats_reports_counts_per_status() {
    let s = store();
    s.put("DR1", &Job::new_copy("", "/a", "", "/x/a", "1")).unwrap();
    s.put("DR1", &Job::new_copy("", "/b", "", "/x/b", "2")).unwrap();
    let _taken = s.get("DR1").unwrap().unwrap();

    let stats = s.stats("DR1").unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.processing, 1);
}
