// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! scopy-daemon: the Smart Copy scheduling and execution engine.
//!
//! Wires together the durable queue (`scopy-storage`), the subprocess
//! executor (`scopy-executor`) and the MCS wire codec (`scopy-wire`) behind
//! the DR Worker, Supervisor, Request Handler, and Reference-ID Service.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod activity_monitor;
pub mod config;
pub mod error;
pub mod mail;
pub mod refid_service;
pub mod request_handler;
pub mod semaphore;
pub mod supervisor;
pub mod worker;

pub use config::Config;
pub use error::DaemonError;
pub use request_handler::RequestHandler;
pub use supervisor::Supervisor;
