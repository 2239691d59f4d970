// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active Executor status.
//!
//! Retains the externally visible wire strings (`'active'`, `'paused'`, ...)
//! because they are part of the wire contract, but represents them
//! internally as a sum type with a single projection to string.

use crate::simple_display;

/// Status of a per-recorder Active Executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorStatus {
    /// Not yet started.
    NotStarted,
    /// Running.
    Active,
    /// Externally suspended.
    Paused,
    /// Exit 0.
    Complete,
    /// User cancel.
    Canceled,
    /// Non-zero exit; carries captured stderr (or a synthesized message).
    Error(String),
}

impl ExecutorStatus {
    /// Synthesized status for a retry attempted before its cooldown elapsed.
    pub fn too_soon_to_retry() -> Self {
        ExecutorStatus::Error("too soon to retry".to_string())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutorStatus::Complete | ExecutorStatus::Canceled | ExecutorStatus::Error(_)
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ExecutorStatus::Active)
    }
}

impl std::fmt::Display for ExecutorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorStatus::NotStarted => write!(f, ""),
            ExecutorStatus::Active => write!(f, "active"),
            ExecutorStatus::Paused => write!(f, "paused"),
            ExecutorStatus::Complete => write!(f, "complete"),
            ExecutorStatus::Canceled => write!(f, "canceled"),
            ExecutorStatus::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Supervisor-wide lifecycle status, also the wire `SUMMARY`/status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    Shutdown,
    Booting,
    Normal,
}

simple_display! {
    SupervisorStatus {
        Shutdown => "SHUTDWN",
        Booting => "BOOTING",
        Normal => "NORMAL",
    }
}

/// Queue record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

simple_display! {
    QueueStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "processing" => Some(QueueStatus::Processing),
            "completed" => Some(QueueStatus::Completed),
            "failed" => Some(QueueStatus::Failed),
            _ => None,
        }
    }
}
