// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report (`RPT`) MIB key dispatch: a closed enum over the fixed and
//! per-recorder report keys, rather than a stringly-typed switch.

use crate::error::WireError;

/// A parsed `RPT` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MibKey {
    Summary,
    Info,
    LastLog,
    Subsystem,
    SerialNo,
    Version,
    ObsStatus(String),
    QueueSize(String),
    QueueStatus(String),
    QueueStats(String),
    QueueEntry(String),
    ActiveId(String),
    ActiveStatus(String),
    ActiveBytes(String),
    ActiveProgress(String),
    ActiveSpeed(String),
    ActiveRemaining(String),
}

impl MibKey {
    pub fn parse(raw: &str) -> Result<Self, WireError> {
        let raw = raw.trim();
        if let Some(dr) = raw.strip_prefix("OBSSTATUS_") {
            return Ok(MibKey::ObsStatus(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("QUEUE_SIZE_") {
            return Ok(MibKey::QueueSize(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("QUEUE_STATUS_") {
            return Ok(MibKey::QueueStatus(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("QUEUE_STATS_") {
            return Ok(MibKey::QueueStats(dr.to_string()));
        }
        if let Some(id) = raw.strip_prefix("QUEUE_ENTRY_") {
            return Ok(MibKey::QueueEntry(id.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("ACTIVE_ID_") {
            return Ok(MibKey::ActiveId(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("ACTIVE_STATUS_") {
            return Ok(MibKey::ActiveStatus(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("ACTIVE_BYTES_") {
            return Ok(MibKey::ActiveBytes(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("ACTIVE_PROGRESS_") {
            return Ok(MibKey::ActiveProgress(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("ACTIVE_SPEED_") {
            return Ok(MibKey::ActiveSpeed(dr.to_string()));
        }
        if let Some(dr) = raw.strip_prefix("ACTIVE_REMAINING_") {
            return Ok(MibKey::ActiveRemaining(dr.to_string()));
        }
        match raw {
            "SUMMARY" => Ok(MibKey::Summary),
            "INFO" => Ok(MibKey::Info),
            "LASTLOG" => Ok(MibKey::LastLog),
            "SUBSYSTEM" => Ok(MibKey::Subsystem),
            "SERIALNO" => Ok(MibKey::SerialNo),
            "VERSION" => Ok(MibKey::Version),
            other => Err(WireError::UnknownMibKey(other.to_string())),
        }
    }
}
