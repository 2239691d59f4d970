// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference-id request/reply protocol: the client's literal
//! `next_ref` request, the server's ASCII-decimal reply, the 1..999_999_999
//! wraparound, and the checkpoint-every-10 persistence convention.

/// The literal request body a client sends to obtain the next reference id.
pub const NEXT_REF_REQUEST: &str = "next_ref";

/// Highest id before wraparound back to 1.
pub const MAX_REFERENCE_ID: u32 = 999_999_999;

/// How often (in increments) the current id is persisted to the checkpoint
/// file, so a restart skips ahead far enough to never reissue a live id.
pub const CHECKPOINT_INTERVAL: u32 = 10;

/// Monotonic counter over the reference-id socket. Not `Clone`: exactly one
/// instance should own the counter for the process lifetime.
#[derive(Debug)]
pub struct ReferenceIdCounter {
    current: u32,
    since_checkpoint: u32,
}

impl ReferenceIdCounter {
    /// Resume from a checkpointed value, as read from the checkpoint file.
    /// A freshly-booted counter skips ahead by a full checkpoint interval
    /// so it never reissues an id a live peer might still reference.
    pub fn resume_from(checkpoint: u32) -> Self {
        let current = Self::advance(checkpoint, CHECKPOINT_INTERVAL);
        Self { current, since_checkpoint: 0 }
    }

    pub fn fresh() -> Self {
        Self { current: 0, since_checkpoint: 0 }
    }

    fn advance(value: u32, by: u32) -> u32 {
        let mut v = value;
        for _ in 0..by {
            v = if v >= MAX_REFERENCE_ID { 1 } else { v + 1 };
        }
        v
    }

    /// Issue the next id, wrapping `999_999_999 -> 1`.
    ///
    /// Returns the new id and whether the caller should persist a
    /// checkpoint now (every [`CHECKPOINT_INTERVAL`] increments).
    pub fn next(&mut self) -> (u32, bool) {
        self.current = Self::advance(self.current, 1);
        self.since_checkpoint += 1;
        let should_checkpoint = self.since_checkpoint >= CHECKPOINT_INTERVAL;
        if should_checkpoint {
            self.since_checkpoint = 0;
        }
        (self.current, should_checkpoint)
    }

    pub fn current(&self) -> u32 {
        self.current
    }
}

/// Render an id as the ASCII decimal reply body the wire protocol expects.
pub fn encode_reply(id: u32) -> String {
    id.to_string()
}

/// Parse a reply body (or checkpoint file contents) back into an id.
pub fn parse_reply(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}
