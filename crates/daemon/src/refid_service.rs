// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference-ID Service: a tiny TCP listener that answers the literal
//! `next_ref` request with the next ASCII-decimal reference id,
//! checkpointing to disk every ten increments.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use scopy_wire::refid::{self, ReferenceIdCounter, NEXT_REF_REQUEST};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Owns the counter and its checkpoint file. Cloneable; clones share the
/// same counter via the inner mutex.
#[derive(Clone)]
pub struct ReferenceIdService {
    counter: Arc<Mutex<ReferenceIdCounter>>,
    checkpoint_path: PathBuf,
}

impl ReferenceIdService {
    /// Resume from whatever is on disk at `checkpoint_path`, or start fresh
    /// if there is no checkpoint yet.
    pub fn load(checkpoint_path: PathBuf) -> Self {
        let counter = match std::fs::read_to_string(&checkpoint_path) {
            Ok(raw) => match refid::parse_reply(&raw) {
                Some(value) => ReferenceIdCounter::resume_from(value),
                None => {
                    warn!(path = %checkpoint_path.display(), "reference-id checkpoint unreadable, starting fresh");
                    ReferenceIdCounter::fresh()
                }
            },
            Err(_) => ReferenceIdCounter::fresh(),
        };
        Self { counter: Arc::new(Mutex::new(counter)), checkpoint_path }
    }

    fn checkpoint(&self, value: u32) {
        if let Err(e) = std::fs::write(&self.checkpoint_path, refid::encode_reply(value)) {
            warn!(path = %self.checkpoint_path.display(), error = %e, "failed to persist reference-id checkpoint");
        }
    }

    /// Issue the next id, persisting a checkpoint every ten calls.
    pub fn next_id(&self) -> u32 {
        let (id, should_checkpoint) = self.counter.lock().next();
        if should_checkpoint {
            self.checkpoint(id);
        }
        id
    }

    /// Force a checkpoint of the current value, for clean shutdown.
    pub fn checkpoint_now(&self) {
        let current = self.counter.lock().current();
        self.checkpoint(current);
    }

    /// Bind and serve forever. Each connection is expected to send exactly
    /// one `next_ref` request and read exactly one ASCII-decimal reply,
    /// then close.
    pub async fn serve(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let service = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &service).await {
                            debug!(%addr, error = %e, "reference-id connection ended with an error");
                        }
                    });
                }
                Err(e) => error!(error = %e, "reference-id service accept error"),
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, service: &ReferenceIdService) -> std::io::Result<()> {
    let mut buf = [0u8; 64];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    if request.trim() != NEXT_REF_REQUEST {
        warn!(request = %request.trim(), "reference-id service: unrecognized request");
        return Ok(());
    }

    let id = service.next_id();
    info!(id, "issued reference id");
    stream.write_all(refid::encode_reply(id).as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_service_with_no_checkpoint_file_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let service = ReferenceIdService::load(dir.path().join("refid.checkpoint"));
        assert_eq!(service.next_id(), 1);
    }

    #[test]
    fn resumes_from_an_existing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refid.checkpoint");
        std::fs::write(&path, "100").unwrap();
        let service = ReferenceIdService::load(path);
        assert_eq!(service.next_id(), 101);
    }

    #[test]
    fn checkpoints_to_disk_every_ten_issues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refid.checkpoint");
        let service = ReferenceIdService::load(path.clone());
        for _ in 0..10 {
            service.next_id();
        }
        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "10");
    }

    #[test]
    fn checkpoint_now_persists_the_current_value_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refid.checkpoint");
        let service = ReferenceIdService::load(path.clone());
        service.next_id();
        service.next_id();
        service.checkpoint_now();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, "2");
    }
}
