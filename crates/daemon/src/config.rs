// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading: a TOML file plus `SCOPY_*` environment
//! overrides.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::DaemonError;

#[derive(Debug, Clone, Deserialize)]
pub struct McsConfig {
    pub message_in_host: String,
    pub message_in_port: u16,
    pub message_out_host: String,
    pub message_out_port: u16,
    pub message_ref_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub username: String,
    pub password: String,
    pub smtp_server: String,
}

/// Loaded configuration: the abstract MCS/queue table plus the ambient
/// additions (`state_dir`, `log_level`, `recorders`, `archival_host`,
/// `unreliable_link`).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mcs: McsConfig,
    pub email: EmailConfig,

    /// DR ids this process manages.
    pub recorders: Vec<String>,

    /// Terminal-failure threshold.
    pub max_retry: u32,
    /// Retry cooldown, in hours.
    pub wait_retry: u64,
    /// Purge trigger, in TiB.
    pub purge_size: f64,
    /// Cross-host bandwidth cap in MB/s; 0 disables.
    #[serde(default)]
    pub bw_limit: u32,

    /// Root state directory (queue store, reference-id checkpoint, logs).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// The archival host: a config value, not a hardcoded hostname
    /// substring (see DESIGN.md).
    pub archival_host: String,

    /// Site flag for the truncate-on-unreliable-link precondition.
    #[serde(default)]
    pub unreliable_link: bool,

    /// Path to the external MCS activity log the Activity Monitor tails.
    #[serde(default = "default_activity_log_path")]
    pub activity_log_path: PathBuf,

    /// Address the Request Handler reports as its own `sender` subsystem
    /// field in reply headers.
    #[serde(default = "default_subsystem_name")]
    pub subsystem_name: String,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("/var/lib/scopy")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_activity_log_path() -> PathBuf {
    PathBuf::from("/var/log/mcs/mselog.txt")
}

fn default_subsystem_name() -> String {
    "SCM".to_string()
}

impl Config {
    /// Load from a TOML file at `path`, then apply `SCOPY_*` environment
    /// overrides for the values operators most often need to tweak
    /// per-deployment without editing the file.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Fatal(format!("cannot read config {}: {e}", path.display())))?;
        let mut cfg: Config =
            toml::from_str(&raw).map_err(|e| DaemonError::Fatal(format!("invalid config {}: {e}", path.display())))?;
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("SCOPY_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("SCOPY_LOG") {
            self.log_level = level;
        }
        if let Ok(host) = std::env::var("SCOPY_ARCHIVAL_HOST") {
            self.archival_host = host;
        }
    }

    pub fn queue_db_path(&self) -> PathBuf {
        self.state_dir.join("queue.sqlite3")
    }

    pub fn refid_checkpoint_path(&self) -> PathBuf {
        self.state_dir.join("refid.checkpoint")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("logs")
    }

    pub fn wait_retry_secs(&self) -> u64 {
        self.wait_retry * 3600
    }

    pub fn purge_size_bytes(&self) -> u64 {
        (self.purge_size * 1024.0 * 1024.0 * 1024.0 * 1024.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
        recorders = ["DR1", "DR2"]
        max_retry = 3
        wait_retry = 24
        purge_size = 1.0
        bw_limit = 50
        archival_host = "archive"

        [mcs]
        message_in_host = "0.0.0.0"
        message_in_port = 5000
        message_out_host = "0.0.0.0"
        message_out_port = 5001
        message_ref_port = 5002

        [email]
        username = "scm"
        password = "secret"
        smtp_server = "smtp.example.org"
        "#
    }

    #[test]
    fn parses_the_abstract_configuration_table() {
        let cfg: Config = toml::from_str(sample_toml()).unwrap();
        assert_eq!(cfg.recorders, vec!["DR1", "DR2"]);
        assert_eq!(cfg.max_retry, 3);
        assert_eq!(cfg.wait_retry_secs(), 24 * 3600);
        assert_eq!(cfg.bw_limit, 50);
        assert_eq!(cfg.mcs.message_in_port, 5000);
    }

    #[test]
    fn purge_size_converts_tib_to_bytes() {
        let cfg: Config = toml::from_str(sample_toml()).unwrap();
        assert_eq!(cfg.purge_size_bytes(), 1024u64.pow(4));
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let cfg: Config = toml::from_str(sample_toml()).unwrap();
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.unreliable_link);
        assert_eq!(cfg.subsystem_name, "SCM");
        assert_eq!(cfg.activity_log_path, PathBuf::from("/var/log/mcs/mselog.txt"));
    }
}
