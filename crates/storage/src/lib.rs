// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scopy-storage: the durable per-recorder queue, backed by a single
//! SQLite store shared by every DR Worker in the process.

pub mod error;
pub mod queue;

pub use error::StorageError;
pub use queue::{QueueRecord, QueueStats, QueueStore};
