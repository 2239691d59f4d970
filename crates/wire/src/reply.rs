// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reply payload framing: `'A'`/`'R'` accept/reject byte, a 7-char
//! subsystem status, then command-specific bytes.

use crate::error::{RejectCode, WireError};

/// Fixed width of the subsystem status field (e.g. `NORMAL `, `SHUTDWN`).
pub const STATUS_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Accepted,
    Rejected(RejectCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub outcome: ReplyOutcome,
    pub subsystem_status: String,
    pub body: String,
}

impl Reply {
    pub fn accepted(subsystem_status: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            outcome: ReplyOutcome::Accepted,
            subsystem_status: subsystem_status.into(),
            body: body.into(),
        }
    }

    pub fn rejected(subsystem_status: impl Into<String>, code: RejectCode) -> Self {
        Self {
            outcome: ReplyOutcome::Rejected(code),
            subsystem_status: subsystem_status.into(),
            body: code.message().to_string(),
        }
    }

    /// Render as the raw payload bytes that follow the 38-byte header.
    /// The header's `data_len` is `STATUS_LEN + body.len()`.
    pub fn encode(&self) -> String {
        let flag = match self.outcome {
            ReplyOutcome::Accepted => 'A',
            ReplyOutcome::Rejected(_) => 'R',
        };
        let status = &self.subsystem_status;
        let body = &self.body;
        format!("{flag}{status:STATUS_LEN$}{body}")
    }

    pub fn data_len(&self) -> usize {
        STATUS_LEN + self.body.len()
    }

    pub fn decode(payload: &str) -> Result<Self, WireError> {
        if payload.len() < 1 + STATUS_LEN {
            return Err(WireError::PayloadLengthMismatch {
                declared: 1 + STATUS_LEN,
                actual: payload.len(),
            });
        }
        let flag = payload.as_bytes()[0];
        let subsystem_status = payload[1..1 + STATUS_LEN].trim().to_string();
        let body = payload[1 + STATUS_LEN..].to_string();
        let outcome = match flag {
            b'A' => ReplyOutcome::Accepted,
            b'R' => ReplyOutcome::Rejected(RejectCode::OtherError),
            _ => {
                return Err(WireError::MalformedField {
                    field: "accept_reject_flag",
                    value: (flag as char).to_string(),
                })
            }
        };
        Ok(Self { outcome, subsystem_status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_reply_round_trips() {
        let r = Reply::accepted("NORMAL", "pong");
        let wire = r.encode();
        assert_eq!(&wire[0..1], "A");
        let decoded = Reply::decode(&wire).unwrap();
        assert_eq!(decoded.outcome, ReplyOutcome::Accepted);
        assert_eq!(decoded.subsystem_status, "NORMAL");
        assert_eq!(decoded.body, "pong");
    }

    #[test]
    fn rejected_reply_carries_the_fixed_message() {
        let r = Reply::rejected("NORMAL", RejectCode::Busy);
        assert_eq!(r.body, "Blocking operation in progress");
        assert_eq!(&r.encode()[0..1], "R");
    }

    #[test]
    fn data_len_counts_status_plus_body() {
        let r = Reply::accepted("SHUTDWN", "abc");
        assert_eq!(r.data_len(), STATUS_LEN + 3);
    }
}
