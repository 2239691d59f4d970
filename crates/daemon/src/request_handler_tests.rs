use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use scopy_core::{ExecutorStatus, FakeClock, Job};
use scopy_executor::Progress;
use scopy_storage::QueueStore;
use scopy_wire::Header;

use super::*;
use crate::worker::{ExecutorFactory, ExecutorHandle, SourceProbe};

struct FakeExecutor {
    job: Job,
    status: ExecutorStatus,
}

#[async_trait]
impl ExecutorHandle for FakeExecutor {
    fn job(&self) -> &Job {
        &self.job
    }
    fn status(&self) -> &ExecutorStatus {
        &self.status
    }
    fn poll(&mut self) -> &ExecutorStatus {
        &self.status
    }
    fn progress(&self) -> Progress {
        Progress::unstarted()
    }
    async fn pause(&mut self) {}
    async fn cancel(&mut self) {}
    fn is_complete(&self) -> bool {
        false
    }
    fn is_successful(&self) -> bool {
        false
    }
}

struct FakeFactory;

impl ExecutorFactory for FakeFactory {
    fn start(&self, job: Job, _now_secs: u64, _bw_limit_mb: u32, _unreliable_link: bool) -> Box<dyn ExecutorHandle> {
        Box::new(FakeExecutor { job, status: ExecutorStatus::Active })
    }
}

struct FakeProbe;

#[async_trait]
impl SourceProbe for FakeProbe {
    async fn file_exists(&self, _host: &str, _path: &str) -> bool {
        true
    }
}

fn test_config() -> crate::config::Config {
    let toml = r#"
    recorders = ["DR1"]
    max_retry = 3
    wait_retry = 24
    purge_size = 1.0
    bw_limit = 0
    archival_host = "archive"

    [mcs]
    message_in_host = "0.0.0.0"
    message_in_port = 5000
    message_out_host = "0.0.0.0"
    message_out_port = 5001
    message_ref_port = 5002

    [email]
    username = "scm@example.org"
    password = "secret"
    smtp_server = "smtp.example.org"
    "#;
    toml::from_str(toml).unwrap()
}

async fn handler() -> RequestHandler<FakeClock> {
    let queue = QueueStore::open_in_memory().unwrap();
    let sup = Arc::new(crate::supervisor::Supervisor::new(
        test_config(),
        queue,
        FakeClock::new(),
        Arc::new(FakeFactory),
        Arc::new(FakeProbe),
        None,
    ));
    sup.initialize().await.unwrap();
    sup.resume(&scopy_wire::RecorderTarget::All).await.unwrap();
    RequestHandler::new(sup, "SCM")
}

fn request(command: &str, reference: u32, body: &str) -> String {
    let header = Header::new("SCM", "MCS", command, reference, body.len() as u32, SystemTime::now());
    format!("{}{}", header.encode(), body)
}

#[tokio::test]
async fn ping_is_accepted_and_replies_pong() {
    let h = handler().await;
    let reply = h.handle(&request("PNG", 1, "")).await;

    let header = Header::decode(&reply).unwrap();
    assert_eq!(header.command, "PNG");
    assert_eq!(header.reference, 1);

    let payload = scopy_wire::Reply::decode(&reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert_eq!(payload.outcome, scopy_wire::ReplyOutcome::Accepted);
    assert_eq!(payload.body, "pong");
}

#[tokio::test]
async fn malformed_header_is_rejected() {
    let h = handler().await;
    let reply = h.handle("too short").await;
    let payload = scopy_wire::Reply::decode(&reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert!(matches!(payload.outcome, scopy_wire::ReplyOutcome::Rejected(_)));
}

#[tokio::test]
async fn unknown_command_code_is_rejected() {
    let h = handler().await;
    let reply = h.handle(&request("XYZ", 2, "")).await;
    let payload = scopy_wire::Reply::decode(&reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert!(matches!(payload.outcome, scopy_wire::ReplyOutcome::Rejected(_)));
}

#[tokio::test]
async fn copy_command_dispatches_to_the_named_recorder() {
    let h = handler().await;
    let reply = h.handle(&request("SCP", 3, "DR1:/a/b.dat->archive:/x/")).await;
    let payload = scopy_wire::Reply::decode(&reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert_eq!(payload.outcome, scopy_wire::ReplyOutcome::Accepted);
}

#[tokio::test]
async fn copy_to_an_unknown_recorder_is_rejected() {
    let h = handler().await;
    let reply = h.handle(&request("SCP", 4, "DR9:/a/b.dat->archive:/x/")).await;
    let payload = scopy_wire::Reply::decode(&reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert!(matches!(payload.outcome, scopy_wire::ReplyOutcome::Rejected(_)));
}

#[tokio::test]
async fn report_command_answers_with_the_queue_entry_for_its_own_reference() {
    let h = handler().await;
    let copy_reply = h.handle(&request("SCP", 5, "DR1:/a/b.dat->archive:/x/")).await;
    assert_eq!(
        scopy_wire::Reply::decode(&copy_reply[scopy_wire::HEADER_LEN..]).unwrap().outcome,
        scopy_wire::ReplyOutcome::Accepted
    );

    let report_reply = h.handle(&request("RPT", 6, "QUEUE_ENTRY_5")).await;
    let payload = scopy_wire::Reply::decode(&report_reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert_eq!(payload.outcome, scopy_wire::ReplyOutcome::Accepted);
    assert_eq!(payload.body, "queued");
}

#[tokio::test]
async fn duplicate_reference_replays_the_cached_reply_without_redispatching() {
    let h = handler().await;
    let raw = request("SCP", 7, "DR1:/a/b.dat->archive:/x/");
    let first = h.handle(&raw).await;
    let second = h.handle(&raw).await;
    assert_eq!(first, second);

    // A second SCP for the same reference must not have enqueued a second
    // job: queue size for DR1 stays at 1.
    let report_reply = h.handle(&request("RPT", 8, "QUEUE_SIZE_DR1")).await;
    let payload = scopy_wire::Reply::decode(&report_reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert_eq!(payload.body, "1");
}

#[tokio::test]
async fn cancel_command_marks_the_job_canceled() {
    let h = handler().await;
    h.handle(&request("SCP", 9, "DR1:/a/b.dat->archive:/x/")).await;
    let cancel_reply = h.handle(&request("SCN", 10, "9")).await;
    assert_eq!(
        scopy_wire::Reply::decode(&cancel_reply[scopy_wire::HEADER_LEN..]).unwrap().outcome,
        scopy_wire::ReplyOutcome::Accepted
    );

    let report_reply = h.handle(&request("RPT", 11, "QUEUE_ENTRY_9")).await;
    let payload = scopy_wire::Reply::decode(&report_reply[scopy_wire::HEADER_LEN..]).unwrap();
    assert_eq!(payload.body, "canceled");
}
