// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure-digest emailer: a STARTTLS `AsyncSmtpTransport<Tokio1Executor>`
//! built once at startup and reused for every digest.

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use scopy_storage::QueueRecord;
use thiserror::Error;
use tracing::info;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mailbox address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("failed to connect to relay {host}: {source}")]
    Relay {
        host: String,
        #[source]
        source: lettre::transport::smtp::Error,
    },
    #[error("failed to send message: {0}")]
    Send(#[from] lettre::transport::smtp::Error),
}

/// Sends the once-daily per-recorder failure digest.
pub struct MailDigest {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl MailDigest {
    /// Build a STARTTLS transport from the loaded [`EmailConfig`].
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
            .map_err(|source| MailError::Relay { host: config.smtp_server.clone(), source })?
            .credentials(creds)
            .build();
        let from: Mailbox = config.username.parse()?;
        Ok(Self { transport, from })
    }

    /// Compose and send a digest of `failed` rows for `recorder` to `to`.
    /// Each digest carries a distinct subject line (recorder, count, and a
    /// monotonic-looking sequence drawn from the first row's id) so that
    /// mail clients which collapse identical subjects into one thread
    /// don't swallow consecutive days' digests.
    pub async fn send_digest(&self, recorder: &str, failed: &[QueueRecord], to: &str) -> Result<(), MailError> {
        let seq = failed.first().map(|r| r.job.id.as_str()).unwrap_or("0");
        let subject = format!("[scopy] {recorder}: {} failed transfer(s) (#{seq})", failed.len());
        let body = render_digest_body(recorder, failed);

        let to: Mailbox = to.parse()?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body)?;

        self.transport.send(message).await?;
        info!(recorder, count = failed.len(), "sent failure digest");
        Ok(())
    }
}

fn render_digest_body(recorder: &str, failed: &[QueueRecord]) -> String {
    let mut body = format!("Failed transfers for {recorder}:\n\n");
    for row in failed {
        body.push_str(&format!(
            "  id={} {} -> {} reason={}\n",
            row.job.id,
            row.job.source_path,
            row.job.dest_path,
            row.reason.as_deref().unwrap_or("unknown"),
        ));
    }
    body
}
