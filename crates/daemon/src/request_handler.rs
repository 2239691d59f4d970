// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request Handler: decodes a full request message (header + payload),
//! dispatches it onto the [`Supervisor`], and encodes the reply.
//! Duplicate reference ids (the MCS sender's own retransmits) are
//! suppressed by replaying the cached reply rather than re-running a
//! non-idempotent command twice.

use std::time::SystemTime;

use parking_lot::Mutex;
use scopy_core::{BoundedMap, Clock};
use scopy_wire::{Command, Header, Reply};
use tracing::{info, warn};

use crate::error::DaemonError;
use crate::supervisor::Supervisor;

/// Cap on the recent-reference de-dup cache.
const RECENT_REFS_CACHE_SIZE: usize = 256;

/// Decodes/dispatches/encodes one request at a time. Cheap to construct
/// per-connection since the de-dup cache lives on the shared [`Supervisor`]
/// side would require a lock per request anyway; instead one handler is
/// built once at startup and shared behind an `Arc`.
pub struct RequestHandler<C: Clock + 'static> {
    supervisor: std::sync::Arc<Supervisor<C>>,
    subsystem_name: String,
    recent: Mutex<BoundedMap<u32, String>>,
}

impl<C: Clock + 'static> RequestHandler<C> {
    pub fn new(supervisor: std::sync::Arc<Supervisor<C>>, subsystem_name: impl Into<String>) -> Self {
        Self {
            supervisor,
            subsystem_name: subsystem_name.into(),
            recent: Mutex::new(BoundedMap::new(RECENT_REFS_CACHE_SIZE)),
        }
    }

    /// Decode `raw` (header + payload), dispatch, and return the encoded
    /// reply bytes (header + payload) ready to write back to the client.
    pub async fn handle(&self, raw: &str) -> String {
        let header = match Header::decode(raw) {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "request handler: failed to decode header");
                return self.encode(0, "???", Reply::rejected(self.status_str().await, scopy_wire::RejectCode::InvalidArguments));
            }
        };

        if let Some(cached) = self.recent.lock().get(&header.reference).cloned() {
            info!(reference = header.reference, "request handler: replaying cached reply for duplicate reference");
            return cached;
        }

        let payload = &raw[scopy_wire::HEADER_LEN..];
        let reply = self.dispatch(&header, payload).await;
        let encoded = self.encode(header.reference, header.command.as_str(), reply);
        self.recent.lock().insert(header.reference, encoded.clone());
        encoded
    }

    async fn status_str(&self) -> String {
        self.supervisor.status().to_string()
    }

    fn encode(&self, reference: u32, command: &str, reply: Reply) -> String {
        let body = reply.encode();
        let header = Header::new(self.subsystem_name.clone(), "MCS", command, reference, reply.data_len() as u32, SystemTime::now());
        format!("{}{}", header.encode(), body)
    }

    async fn dispatch(&self, header: &Header, payload: &str) -> Reply {
        let command = match Command::parse(&header.command, payload) {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, command = %header.command, "request handler: failed to parse command");
                return Reply::rejected(self.status_str().await, scopy_wire::protocol_reject_code(&e));
            }
        };

        let id = header.reference.to_string();
        let result = self.run(command, &id).await;
        match result {
            Ok(body) => Reply::accepted(self.status_str().await, body),
            Err(e) => {
                warn!(error = %e, reference = header.reference, "request handler: command failed");
                Reply::rejected(self.status_str().await, e.reject_code())
            }
        }
    }

    async fn run(&self, command: Command, id: &str) -> Result<String, DaemonError> {
        match command {
            Command::Ping => Ok("pong".to_string()),
            Command::Init => {
                self.supervisor.initialize().await?;
                Ok(String::new())
            }
            Command::Shutdown => {
                self.supervisor.shutdown().await?;
                Ok(String::new())
            }
            Command::Copy(args) => {
                self.supervisor
                    .add_copy(&args.source_host, &args.source_host, &args.source_path, &args.dest_host, &args.dest_path, id)
                    .await?;
                Ok(String::new())
            }
            Command::Delete(args) => {
                self.supervisor.add_delete(&args.host, &args.path, args.immediate, id).await?;
                Ok(String::new())
            }
            Command::Pause(target) => {
                self.supervisor.pause(&target).await?;
                Ok(String::new())
            }
            Command::Resume(target) => {
                self.supervisor.resume(&target).await?;
                Ok(String::new())
            }
            Command::Cancel(command_id) => {
                self.supervisor.cancel(&command_id).await?;
                Ok(String::new())
            }
            Command::Report(key) => self.supervisor.report(&key).await,
        }
    }
}

#[cfg(test)]
#[path = "request_handler_tests.rs"]
mod tests;
