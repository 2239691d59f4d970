// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command construction: the exact argv for each of the four copy
//! topologies, the two delete topologies, and the unreliable-link
//! truncate precondition.

use scopy_core::Job;

/// SSH login user used for every remote invocation, matching the
/// `mcsdr@<host>` convention the recorder fleet expects.
pub const REMOTE_USER: &str = "mcsdr";

/// A subprocess-ready command: a program and its argv (excluding argv[0]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Render as a single shell-ish string, for logging only.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

fn remote_login(host: &str) -> String {
    format!("{}@{}", REMOTE_USER, host.to_ascii_lowercase())
}

/// Build the rsync/ssh invocation for a copy job.
/// `bw_limit_mb` is the configured cross-host bandwidth cap in MB/s; `0`
/// disables it. Only applied to the "remote source, other-host dest" case,
/// as specified.
pub fn build_copy_command(job: &Job, bw_limit_mb: u32) -> CommandSpec {
    let local_source = job.source_host.is_empty();
    let local_dest = job.dest_host.is_empty();

    if local_source && local_dest {
        CommandSpec::new(
            "rsync",
            vec![
                "-avH".into(),
                "--append".into(),
                "--partial".into(),
                "--progress".into(),
                job.source_path.clone(),
                job.dest_path.clone(),
            ],
        )
    } else if local_source && !local_dest {
        CommandSpec::new(
            "rsync",
            vec![
                "-avH".into(),
                "--append-verify".into(),
                "--partial".into(),
                "--progress".into(),
                job.source_path.clone(),
                format!("{}:{}", job.dest_host, job.dest_path),
            ],
        )
    } else if job.dest_host == job.source_host {
        let remote = format!(
            "shopt -s huponexit && rsync -avH --append --partial --progress {} {}",
            job.source_path, job.dest_path
        );
        CommandSpec::new("ssh", vec![remote_login(&job.source_host), remote])
    } else {
        let mut rsync_cmd =
            String::from("shopt -s huponexit && rsync -avH --append-verify --partial --progress");
        if bw_limit_mb > 0 {
            rsync_cmd.push_str(&format!(" --bwlimit={bw_limit_mb}m"));
        }
        rsync_cmd.push_str(&format!(
            " {} {}:{}",
            job.source_path, job.dest_host, job.dest_path
        ));
        CommandSpec::new("ssh", vec![remote_login(&job.source_host), rsync_cmd])
    }
}

/// Build the `rm`/`ssh ... sudo rm` invocation for a delete job.
pub fn build_delete_command(job: &Job) -> CommandSpec {
    if job.source_host.is_empty() {
        CommandSpec::new("rm", vec!["-f".into(), job.source_path.clone()])
    } else {
        let remote = format!("shopt -s huponexit && sudo rm -f {}", job.source_path);
        CommandSpec::new("ssh", vec![remote_login(&job.source_host), remote])
    }
}

/// Build the truncate-512KiB-off-the-tail precondition for an
/// unreliable-link site, if one applies to this job. Returns `None` when
/// the link isn't flagged unreliable, or the topology doesn't call for a
/// truncate (remote destinations other than same-host are left alone,
/// matching the source).
pub fn build_truncate_command(job: &Job, unreliable_link: bool) -> Option<CommandSpec> {
    if !unreliable_link || job.is_delete() {
        return None;
    }

    if job.source_host.is_empty() {
        if !job.dest_host.is_empty() {
            return None;
        }
        let script = format!(
            "if test -e {0} && test -d {1}; then truncate -c -s -512K {1}/$(basename {0}); \
             elif test -e {1}; then truncate -c -s -512K {1}; fi",
            job.source_path, job.dest_path
        );
        Some(CommandSpec::new("bash", vec!["-c".into(), script]))
    } else if job.dest_host == job.source_host {
        let script = format!(
            "if test -e {0} && test -d {1}; then truncate -c -s -512K {1}/$(basename {0}); \
             elif test -e {1}; then truncate -c -s -512K {1}; fi",
            job.source_path, job.dest_path
        );
        Some(CommandSpec::new("ssh", vec![remote_login(&job.source_host), script]))
    } else {
        None
    }
}
