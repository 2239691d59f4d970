// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! scopyd: the Smart Copy scheduling and execution daemon.
//!
//! Loads configuration, opens the durable queue, brings up the Supervisor
//! (DR Workers + Activity Monitor), and serves the MCS wire protocol over
//! UDP plus the Reference-ID Service over TCP until SIGTERM/SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use scopy_core::SystemClock;
use scopy_daemon::config::Config;
use scopy_daemon::mail::MailDigest;
use scopy_daemon::refid_service::ReferenceIdService;
use scopy_daemon::request_handler::RequestHandler;
use scopy_daemon::supervisor::Supervisor;
use scopy_daemon::worker::{RealSourceProbe, SubprocessExecutorFactory};
use scopy_storage::QueueStore;
use scopy_wire::HEADER_LEN;
use tokio::net::{TcpListener, UdpSocket};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "/etc/scopy/scopyd.toml";
const UDP_RECV_BUF: usize = 65536;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&config_path)?;

    let _log_guard = setup_logging(&config)?;
    info!(config = %config_path.display(), "starting scopyd");

    let queue = QueueStore::open(config.queue_db_path())?;

    let mail = match MailDigest::new(&config.email) {
        Ok(m) => Some(Arc::new(m)),
        Err(e) => {
            warn!(error = %e, "failed to build mail transport, failure digests will only be logged");
            None
        }
    };

    let supervisor = Arc::new(Supervisor::new(
        config.clone(),
        queue,
        SystemClock,
        Arc::new(SubprocessExecutorFactory),
        Arc::new(RealSourceProbe),
        mail,
    ));
    supervisor.initialize().await?;

    let refid = ReferenceIdService::load(config.refid_checkpoint_path());
    let refid_listener = TcpListener::bind((config.mcs.message_in_host.as_str(), config.mcs.message_ref_port)).await?;
    tokio::spawn(refid.clone().serve(refid_listener));

    let request_handler = Arc::new(RequestHandler::new(supervisor.clone(), config.subsystem_name.clone()));
    let udp = Arc::new(UdpSocket::bind((config.mcs.message_in_host.as_str(), config.mcs.message_in_port)).await?);
    info!(addr = %udp.local_addr()?, "listening for MCS requests");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        let mut buf = vec![0u8; UDP_RECV_BUF];
        tokio::select! {
            result = udp.recv_from(&mut buf) => {
                match result {
                    Ok((n, peer)) => {
                        if n < HEADER_LEN {
                            warn!(%peer, len = n, "dropping undersized datagram");
                            continue;
                        }
                        let handler = request_handler.clone();
                        let reply_socket = udp.clone();
                        let raw = String::from_utf8_lossy(&buf[..n]).into_owned();
                        tokio::spawn(async move {
                            let reply = handler.handle(&raw).await;
                            if let Err(e) = reply_socket.send_to(reply.as_bytes(), peer).await {
                                error!(%peer, error = %e, "failed to send reply");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "UDP recv error"),
                }
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    supervisor.shutdown().await?;
    refid.checkpoint_now();
    info!("scopyd stopped");
    Ok(())
}

fn setup_logging(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(config.log_dir())?;
    let file_appender = tracing_appender::rolling::daily(config.log_dir(), "scopyd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(guard)
}
