// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide error kinds, represented as a single sum type with one
//! projection to the wire's accept/reject code.

use scopy_wire::RejectCode;
use thiserror::Error;

/// None of these terminate the process except [`DaemonError::Fatal`];
/// callers log and continue.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("another control operation is already active")]
    BusyState,

    #[error("subsystem is not initialized")]
    NotInitialized,

    #[error("queue store error: {0}")]
    QueueStore(#[from] scopy_storage::StorageError),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("resource contention: {0}")]
    ResourceContention(String),

    #[error("activity log decode error: {0}")]
    RecoverableLogTail(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl DaemonError {
    /// Whether the outer request loop should treat this as anything other
    /// than "log and continue". Only bind-socket failure at startup is
    /// fatal; no other path exits the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DaemonError::Fatal(_))
    }

    /// The reject code a Request Handler returns for this error, when it
    /// surfaces as an `'R'` reply. Resource contention and log-tail errors
    /// never reach the wire — they're handled internally.
    pub fn reject_code(&self) -> RejectCode {
        match self {
            DaemonError::Protocol(_) => RejectCode::InvalidArguments,
            DaemonError::BusyState => RejectCode::Busy,
            DaemonError::NotInitialized => RejectCode::NotInitialized,
            DaemonError::QueueStore(_) | DaemonError::Executor(_) => RejectCode::OtherError,
            DaemonError::ResourceContention(_) | DaemonError::RecoverableLogTail(_) | DaemonError::Fatal(_) => {
                RejectCode::OtherError
            }
        }
    }
}

impl From<scopy_wire::WireError> for DaemonError {
    fn from(e: scopy_wire::WireError) -> Self {
        DaemonError::Protocol(e.to_string())
    }
}
