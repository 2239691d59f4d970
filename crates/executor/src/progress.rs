// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress parsing: a single regular expression extracts
//! `(transferred_bytes, percent, speed, remaining)` from the latest stdout
//! line matching rsync's `--progress` format.

use regex::Regex;
use std::sync::OnceLock;

/// Parsed progress snapshot of an in-flight rsync transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub transferred: String,
    pub percent: String,
    pub speed: String,
    pub remaining: String,
}

impl Progress {
    /// Default snapshot reported while the executor has not produced any
    /// parseable line yet: `"0"`, `"0%"`, `"0.00kB/s"`, `"99:59:59"`.
    pub fn unstarted() -> Self {
        Self {
            transferred: "0".into(),
            percent: "0%".into(),
            speed: "0.00kB/s".into(),
            remaining: "99:59:59".into(),
        }
    }
}

fn rsync_progress_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<transferred>\d+) +(?P<progress>\d{1,3}%) +(?P<speed>\d+\.\d+[ kMG]B/s) +(?P<remaining>\S+)")
            .expect("static rsync progress regex is valid")
    })
}

/// Scan `stdout` (the executor's entire buffered stdout so far) for the
/// most recent progress line, returning the last match if any.
pub fn parse_latest(stdout: &str) -> Option<Progress> {
    rsync_progress_re()
        .captures_iter(stdout)
        .last()
        .map(|caps| Progress {
            transferred: caps["transferred"].to_string(),
            percent: caps["progress"].to_string(),
            speed: caps["speed"].to_string(),
            remaining: caps["remaining"].to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_typical_rsync_progress_line() {
        let line = "      1,048,576  23%    2.00MB/s    0:00:04";
        let p = parse_latest(line).unwrap();
        assert_eq!(p.transferred, "576");
        assert_eq!(p.percent, "23%");
        assert_eq!(p.speed, "2.00MB/s");
        assert_eq!(p.remaining, "0:00:04");
    }

    #[test]
    fn takes_the_most_recent_line_when_several_are_present() {
        let buf = "      100  1%    1.00kB/s    0:10:00\n      200  2%    2.00kB/s    0:05:00\n";
        let p = parse_latest(buf).unwrap();
        assert_eq!(p.percent, "2%");
    }

    #[test]
    fn returns_none_without_a_match() {
        assert!(parse_latest("building file list ... done").is_none());
    }
}
