// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level error kinds and the fixed reject-code table they project to.

use thiserror::Error;

/// Numeric reject code returned alongside an `'R'` reply, drawn from a
/// fixed table the MCS peer expects verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    InvalidArguments = 0x01,
    OtherError = 0x02,
    Busy = 0x03,
    NotInitialized = 0x04,
}

impl RejectCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The fixed human-readable message for this code.
    pub fn message(self) -> &'static str {
        match self {
            RejectCode::InvalidArguments => "Invalid arguments to command",
            RejectCode::OtherError => "Other error running command",
            RejectCode::Busy => "Blocking operation in progress",
            RejectCode::NotInitialized => "Subsystem needs to be initialized",
        }
    }
}

/// Errors produced while decoding a request or encoding a reply.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("header too short: got {0} bytes, need at least 38")]
    HeaderTooShort(usize),

    #[error("malformed field {field}: {value:?}")]
    MalformedField { field: &'static str, value: String },

    #[error("payload length mismatch: header declared {declared}, got {actual}")]
    PayloadLengthMismatch { declared: usize, actual: usize },

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("unknown MIB key {0:?}")]
    UnknownMibKey(String),

    #[error("malformed SCP/SRM argument: {0:?}")]
    MalformedArgument(String),
}

/// Maps a [`WireError`] to the reject code a Request Handler returns for
/// it; every decode failure is a protocol rejection, never fatal.
pub fn protocol_reject_code(_err: &WireError) -> RejectCode {
    RejectCode::InvalidArguments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_codes_match_the_fixed_table() {
        assert_eq!(RejectCode::InvalidArguments.code(), 0x01);
        assert_eq!(RejectCode::OtherError.code(), 0x02);
        assert_eq!(RejectCode::Busy.code(), 0x03);
        assert_eq!(RejectCode::NotInitialized.code(), 0x04);
    }
}
