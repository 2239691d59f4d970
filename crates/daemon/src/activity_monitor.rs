// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity Monitor: tails an append-only external event log and derives
//! a boolean busy/idle state per recorder.

use std::collections::HashMap;
use std::process::Stdio;

use scopy_core::BoundedMap;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

/// Pending-command cache capacity.
const PENDING_CACHE_SIZE: usize = 64;

/// One parsed line of the external activity log:
/// `... <ref> <status> <subsystem> <command> <data>|...`. Only the last
/// five whitespace-separated fields matter; the log's own prefix columns
/// (timestamp etc.) are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogLine {
    reference: u32,
    status: u8,
    subsystem: String,
    command: String,
    data: String,
}

fn parse_log_line(line: &str) -> Option<LogLine> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 9 {
        return None;
    }
    let reference = fields[5].parse().ok()?;
    let status = fields[6].parse().ok()?;
    let subsystem = fields[7].to_string();
    let command = fields[8].to_string();
    let raw_data = fields.get(9).copied().unwrap_or("");
    let data = raw_data.rsplit_once('|').map(|(head, _)| head).unwrap_or(raw_data).to_string();
    Some(LogLine { reference, status, subsystem, command, data })
}

/// The awaited-command descriptor recorded when a request is dispatched
/// (status 2), consumed when it's responded to (status 3).
#[derive(Debug, Clone)]
struct Pending {
    subsystem: String,
    command: String,
    data: String,
}

/// Tracks per-recorder busy/idle state from the activity log.
pub struct ActivityMonitor {
    busy: HashMap<String, bool>,
    pending: BoundedMap<u32, Pending>,
}

impl ActivityMonitor {
    /// All recorders start assumed busy.
    pub fn new(recorders: impl IntoIterator<Item = String>) -> Self {
        let busy = recorders.into_iter().map(|dr| (dr, true)).collect();
        Self { busy, pending: BoundedMap::new(PENDING_CACHE_SIZE) }
    }

    pub fn is_busy(&self, recorder: &str) -> bool {
        self.busy.get(recorder).copied().unwrap_or(true)
    }

    /// Feed one raw log line through the parser and rules table. Returns
    /// `Some((recorder, new_busy))` exactly once per observed transition,
    /// `None` otherwise (unparseable line, non-DR subsystem, or no
    /// change).
    pub fn apply_line(&mut self, line: &str) -> Option<(String, bool)> {
        let parsed = match parse_log_line(line) {
            Some(p) => p,
            None => {
                debug!(line, "activity monitor: unparseable log line");
                return None;
            }
        };

        if !parsed.subsystem.starts_with("DR") {
            return None;
        }

        let new_busy = match parsed.status {
            2 => {
                self.pending.insert(
                    parsed.reference,
                    Pending {
                        subsystem: parsed.subsystem.clone(),
                        command: parsed.command.clone(),
                        data: parsed.data.clone(),
                    },
                );
                return None;
            }
            3 => self.resolve_response(&parsed)?,
            8 => true,
            _ => return None,
        };

        let prior = self.busy.get(&parsed.subsystem).copied();
        if prior == Some(new_busy) {
            return None;
        }
        self.busy.insert(parsed.subsystem.clone(), new_busy);
        Some((parsed.subsystem, new_busy))
    }

    fn resolve_response(&mut self, parsed: &LogLine) -> Option<bool> {
        match parsed.command.as_str() {
            "SHT" | "REC" | "SPC" => Some(true),
            "INI" | "STP" => Some(false),
            "RPT" => {
                let awaited = self.pending.get(&parsed.reference)?;
                match awaited.data.as_str() {
                    "OP-TYPE" => Some(!parsed.data.starts_with("Idle")),
                    "SUMMARY" => Some(!parsed.data.starts_with("NORMAL")),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Tail `path` with `tail -F` and feed every line through `monitor`,
/// invoking `on_change` once per observed busy/idle transition. Runs
/// until the process is killed or the tail child exits; a read error is
/// logged and ends the loop, it does not bring down the daemon.
pub async fn run(
    path: &std::path::Path,
    mut monitor: ActivityMonitor,
    mut on_change: impl FnMut(&str, bool),
) {
    let child = tokio::process::Command::new("tail")
        .arg("-F")
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn();

    let mut child = match child {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, path = %path.display(), "activity monitor: failed to spawn tail -F");
            return;
        }
    };

    let Some(stdout) = child.stdout.take() else {
        warn!("activity monitor: tail child has no stdout");
        return;
    };

    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if let Some((dr, busy)) = monitor.apply_line(&line) {
                    info!(recorder = %dr, busy, "activity monitor: state changed");
                    on_change(&dr, busy);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "activity monitor: error reading tail output");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(ref_id: u32, status: u8, subsys: &str, cmd: &str, data: &str) -> String {
        format!("2026-01-01 00:00:00.000 MCS 0 X {ref_id} {status} {subsys} {cmd} {data}|extra")
    }

    #[test]
    fn ignores_non_dr_subsystems() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        assert_eq!(mon.apply_line(&line(1, 3, "SCM", "SHT", "-")), None);
    }

    #[test]
    fn sht_rec_spc_mark_busy() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        // DR1 starts busy; force it idle first so SHT produces a real transition.
        mon.busy.insert("DR1".to_string(), false);
        assert_eq!(mon.apply_line(&line(1, 3, "DR1", "SHT", "-")), Some(("DR1".to_string(), true)));
    }

    #[test]
    fn ini_stp_mark_idle() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        assert_eq!(mon.apply_line(&line(1, 3, "DR1", "INI", "-")), Some(("DR1".to_string(), false)));
    }

    #[test]
    fn dead_subsystem_marks_busy() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        mon.busy.insert("DR1".to_string(), false);
        assert_eq!(mon.apply_line(&line(1, 8, "DR1", "XXX", "-")), Some(("DR1".to_string(), true)));
    }

    #[test]
    fn rpt_optype_idle_prefix_marks_idle() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        mon.apply_line(&line(5, 2, "DR1", "RPT", "OP-TYPE"));
        assert_eq!(mon.apply_line(&line(5, 3, "DR1", "RPT", "Idle")), Some(("DR1".to_string(), false)));
    }

    #[test]
    fn rpt_optype_non_idle_marks_busy() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        mon.busy.insert("DR1".to_string(), false);
        mon.apply_line(&line(5, 2, "DR1", "RPT", "OP-TYPE"));
        assert_eq!(mon.apply_line(&line(5, 3, "DR1", "RPT", "Recording")), Some(("DR1".to_string(), true)));
    }

    #[test]
    fn rpt_summary_non_normal_marks_busy() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        mon.busy.insert("DR1".to_string(), false);
        mon.apply_line(&line(7, 2, "DR1", "RPT", "SUMMARY"));
        assert_eq!(mon.apply_line(&line(7, 3, "DR1", "RPT", "WARNING")), Some(("DR1".to_string(), true)));
    }

    #[test]
    fn rpt_without_prior_pending_is_ignored() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        assert_eq!(mon.apply_line(&line(99, 3, "DR1", "RPT", "Idle")), None);
    }

    #[test]
    fn no_event_emitted_when_state_does_not_change() {
        let mut mon = ActivityMonitor::new(["DR1".to_string()]);
        // DR1 already busy by default; SHT -> busy is a no-op.
        assert_eq!(mon.apply_line(&line(1, 3, "DR1", "SHT", "-")), None);
    }
}
