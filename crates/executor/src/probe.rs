// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-exists and size probes: `du -b`, local or over ssh.

use crate::command::REMOTE_USER;

fn probe_command(host: &str, path: &str) -> tokio::process::Command {
    if host.is_empty() {
        let mut cmd = tokio::process::Command::new("du");
        cmd.args(["-b", path]);
        cmd
    } else {
        let mut cmd = tokio::process::Command::new("ssh");
        cmd.arg(format!("{}@{}", REMOTE_USER, host.to_ascii_lowercase()));
        cmd.arg(format!("du -b {path}"));
        cmd
    }
}

/// Does the source file still exist? Absence (or any probe error) is
/// treated as `false` — it decides whether a failed job is retryable.
pub async fn file_exists(host: &str, path: &str) -> bool {
    probe_command(host, path)
        .output()
        .await
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| parse_size(&out.stdout))
        .is_some()
}

/// Size in bytes to be copied, or 0 if the probe fails.
pub async fn file_size(host: &str, path: &str) -> u64 {
    probe_command(host, path)
        .output()
        .await
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| parse_size(&out.stdout))
        .unwrap_or(0)
}

fn parse_size(stdout: &[u8]) -> Option<u64> {
    let text = std::str::from_utf8(stdout).ok()?;
    text.split_whitespace().next()?.parse().ok()
}
