use std::sync::Arc;

use async_trait::async_trait;
use scopy_core::{ExecutorStatus, FakeClock, Job};
use scopy_executor::Progress;
use scopy_storage::QueueStore;
use scopy_wire::RecorderTarget;

use super::*;

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
    async fn cancel(&mut self) {
        self.status = ExecutorStatus::Canceled;
    }
    fn is_complete(&self) -> bool {
        false
    }
    fn is_successful(&self) -> bool {
        false
    }
}

/// Every dispatched job just sits `Active` forever; these tests exercise
/// dispatch plumbing and control ops, not completion.
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

fn test_config() -> Config {
    let toml = r#"
    recorders = ["DR1", "DR2"]
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

fn supervisor() -> Arc<Supervisor<FakeClock>> {
    let queue = QueueStore::open_in_memory().unwrap();
    Arc::new(Supervisor::new(
        test_config(),
        queue,
        FakeClock::new(),
        Arc::new(FakeFactory),
        Arc::new(FakeProbe),
        None,
    ))
}

#[tokio::test]
async fn starts_shutdown_and_becomes_normal_after_initialize() {
    let sup = supervisor();
    assert_eq!(sup.status(), SupervisorStatus::Shutdown);
    sup.initialize().await.unwrap();
    assert_eq!(sup.status(), SupervisorStatus::Normal);
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn a_second_initialize_is_rejected_while_one_is_running() {
    let sup = supervisor();
    sup.begin_active_process(ActiveProcess::Ini).unwrap();
    let err = sup.initialize().await.unwrap_err();
    assert!(matches!(err, DaemonError::BusyState));
}

#[tokio::test]
async fn operations_are_rejected_before_initialize() {
    let sup = supervisor();
    let err = sup.add_copy("DR1", "DR1", "/a/b.dat", "archive", "/x/", "1").await.unwrap_err();
    assert!(matches!(err, DaemonError::NotInitialized));
}

#[tokio::test]
async fn add_copy_routes_to_the_named_recorder_only() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    sup.add_copy("DR1", "DR1", "/a/b.dat", "archive", "/x/", "1").await.unwrap();

    let err = sup.add_copy("DR9", "DR9", "/a/b.dat", "archive", "/x/", "2").await.unwrap_err();
    assert!(matches!(err, DaemonError::Protocol(_)));
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn pause_all_sets_every_worker_global_inhibit() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    sup.resume(&RecorderTarget::All).await.unwrap();
    sup.pause(&RecorderTarget::All).await.unwrap();

    let report = sup.report(&MibKey::ObsStatus("DR1".to_string())).await.unwrap();
    assert_eq!(report, "INHIBITED");
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn resume_one_only_lifts_inhibit_on_that_recorder() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    sup.resume(&RecorderTarget::One("DR1".to_string())).await.unwrap();

    assert_eq!(sup.report(&MibKey::ObsStatus("DR1".to_string())).await.unwrap(), "NORMAL");
    assert_eq!(sup.report(&MibKey::ObsStatus("DR2".to_string())).await.unwrap(), "INHIBITED");
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn report_answers_fixed_keys_without_a_recorder() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    assert_eq!(sup.report(&MibKey::Summary).await.unwrap(), "NORMAL");
    assert_eq!(sup.report(&MibKey::Subsystem).await.unwrap(), "SCM");
    assert_eq!(sup.report(&MibKey::Version).await.unwrap(), env!("CARGO_PKG_VERSION"));
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn queue_size_and_stats_report_for_a_known_recorder() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    sup.resume(&RecorderTarget::All).await.unwrap();
    sup.add_copy("DR1", "DR1", "/a/b.dat", "archive", "/x/", "1").await.unwrap();

    let size = sup.report(&MibKey::QueueSize("DR1".to_string())).await.unwrap();
    assert_eq!(size, "1");

    let stats = sup.report(&MibKey::QueueStats("DR1".to_string())).await.unwrap();
    assert!(stats.contains("pending=1") || stats.contains("processing=1"));
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn queue_entry_reports_the_cached_result_for_an_id() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    sup.add_copy("DR1", "DR1", "/a/b.dat", "archive", "/x/", "7").await.unwrap();

    let entry = sup.report(&MibKey::QueueEntry("7".to_string())).await.unwrap();
    assert_eq!(entry, "queued");
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn queue_entry_rejects_an_unknown_id() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    let err = sup.report(&MibKey::QueueEntry("nope".to_string())).await.unwrap_err();
    assert!(matches!(err, DaemonError::Protocol(_)));
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn cancel_marks_the_job_canceled_on_every_worker() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    sup.add_copy("DR1", "DR1", "/a/b.dat", "archive", "/x/", "3").await.unwrap();
    sup.cancel("3").await.unwrap();

    let entry = sup.report(&MibKey::QueueEntry("3".to_string())).await.unwrap();
    assert_eq!(entry, "canceled");
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_rejects_a_concurrent_initialize() {
    let sup = supervisor();
    sup.initialize().await.unwrap();
    sup.begin_active_process(ActiveProcess::Sht).unwrap();
    let err = sup.initialize().await.unwrap_err();
    assert!(matches!(err, DaemonError::BusyState));
    sup.end_active_process();
}
