//! End-to-end worker scenarios over an in-memory settings backend and
//! scripted bridge implementations. Delays are shrunk to milliseconds;
//! assertions poll instead of assuming exact timing.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    lifecycle::{LifecycleChangeStream, LifecycleObserver, LifecycleState},
    network::{NetworkInfo, NetworkMonitor, NetworkStatus},
    notify::{NotificationSeverity, UserNotifier},
    storage::SettingsStore,
    CloudService, CloudStorageClient, DocumentFormat, DocumentGenerator, RemoteFolder,
    ScanSnapshot,
};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_sync::{
    bind_lifecycle, DestinationSource, NewSyncTask, SyncDestination, SyncWorker, SyncWorkerConfig,
    TaskStatus, TaskStore, WorkerStatus,
};
use core_sync::error::Result as SyncResult;
use mockall::mock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::{sleep, Instant};
use uuid::Uuid;

fn init_test_logging() {
    // Only the first test to get here wins the subscriber; that's fine
    let _ = init_logging(LoggingConfig::default().with_format(LogFormat::Compact));
}

fn fast_config() -> SyncWorkerConfig {
    SyncWorkerConfig {
        max_retry_count: 3,
        retry_delays: vec![
            Duration::from_millis(15),
            Duration::from_millis(15),
            Duration::from_millis(15),
        ],
        offline_recheck_delay: Duration::from_millis(20),
        pacing_delay: Duration::from_millis(5),
    }
}

fn snapshot(text: &str) -> ScanSnapshot {
    ScanSnapshot {
        text: text.to_string(),
        captured_at: "2024-05-17T09:30:00Z".to_string(),
        comment: None,
        tags: Vec::new(),
    }
}

fn new_task(scan_id: &str) -> NewSyncTask {
    NewSyncTask {
        scan_id: scan_id.to_string(),
        snapshot: snapshot("scanned text"),
        cloud_service: CloudService::GoogleDrive,
        format: DocumentFormat::Pdf,
        folder: RemoteFolder::default(),
    }
}

// ---------------------------------------------------------------------
// Scripted bridge implementations

struct MemorySettingsStore {
    data: StdMutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    fn new() -> Self {
        Self {
            data: StdMutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.data.lock().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.data.lock().unwrap().keys().cloned().collect())
    }
}

struct TestNetwork {
    connected: AtomicBool,
    probes: AtomicU32,
}

impl TestNetwork {
    fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
            probes: AtomicU32::new(0),
        }
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkMonitor for TestNetwork {
    async fn network_info(&self) -> BridgeResult<NetworkInfo> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let status = if self.connected.load(Ordering::SeqCst) {
            NetworkStatus::Connected
        } else {
            NetworkStatus::Disconnected
        };
        Ok(NetworkInfo {
            status,
            is_metered: false,
        })
    }
}

/// Generator that writes a real file so cleanup behavior is observable
struct TempFileGenerator {
    calls: AtomicU32,
}

impl TempFileGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentGenerator for TempFileGenerator {
    async fn generate(
        &self,
        snapshot: &ScanSnapshot,
        format: DocumentFormat,
    ) -> BridgeResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "scansync-test-{}.{}",
            Uuid::new_v4(),
            format.extension()
        ));
        tokio::fs::write(&path, &snapshot.text)
            .await
            .map_err(BridgeError::Io)?;
        Ok(path)
    }
}

#[derive(Clone, Debug)]
struct UploadCall {
    service: CloudService,
    local_path: PathBuf,
    remote_name: String,
    folder: RemoteFolder,
}

/// Cloud client that fails a scripted number of times, then succeeds
struct ScriptedCloud {
    fail_first: AtomicU32,
    calls: StdMutex<Vec<UploadCall>>,
}

impl ScriptedCloud {
    fn succeeding() -> Self {
        Self::failing_first(0)
    }

    fn failing_first(n: u32) -> Self {
        Self {
            fail_first: AtomicU32::new(n),
            calls: StdMutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CloudStorageClient for ScriptedCloud {
    async fn upload(
        &self,
        service: CloudService,
        local_path: &Path,
        remote_name: &str,
        folder: &RemoteFolder,
    ) -> BridgeResult<String> {
        self.calls.lock().unwrap().push(UploadCall {
            service,
            local_path: local_path.to_path_buf(),
            remote_name: remote_name.to_string(),
            folder: folder.clone(),
        });
        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(BridgeError::OperationFailed("503 service busy".to_string()));
        }
        Ok(format!("remote-{}", remote_name))
    }
}

struct RecordingNotifier {
    events: StdMutex<Vec<(NotificationSeverity, String)>>,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self {
            events: StdMutex::new(Vec::new()),
        }
    }

    fn events(&self) -> Vec<(NotificationSeverity, String)> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, severity: NotificationSeverity) -> usize {
        self.events()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

#[async_trait]
impl UserNotifier for RecordingNotifier {
    async fn notify(&self, message: &str, severity: NotificationSeverity) {
        self.events
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

struct FixedDestination(Option<SyncDestination>);

#[async_trait]
impl DestinationSource for FixedDestination {
    async fn destination(&self) -> SyncResult<Option<SyncDestination>> {
        Ok(self.0.clone())
    }
}

struct ChannelLifecycle {
    rx: tokio::sync::Mutex<Option<UnboundedReceiver<LifecycleState>>>,
}

impl ChannelLifecycle {
    fn new() -> (Arc<Self>, UnboundedSender<LifecycleState>) {
        let (tx, rx) = unbounded_channel();
        (
            Arc::new(Self {
                rx: tokio::sync::Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl LifecycleObserver for ChannelLifecycle {
    async fn state(&self) -> BridgeResult<LifecycleState> {
        Ok(LifecycleState::Foreground)
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn LifecycleChangeStream>> {
        let rx = self.rx.lock().await.take().ok_or_else(|| {
            BridgeError::OperationFailed("already subscribed".to_string())
        })?;
        Ok(Box::new(ChannelLifecycleStream { rx }))
    }
}

struct ChannelLifecycleStream {
    rx: UnboundedReceiver<LifecycleState>,
}

#[async_trait]
impl LifecycleChangeStream for ChannelLifecycleStream {
    async fn next(&mut self) -> Option<LifecycleState> {
        self.rx.recv().await
    }
}

// ---------------------------------------------------------------------
// Harness

struct Harness {
    worker: Arc<SyncWorker>,
    store: Arc<TaskStore>,
    network: Arc<TestNetwork>,
    generator: Arc<TempFileGenerator>,
    cloud: Arc<ScriptedCloud>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new(cloud: ScriptedCloud) -> Self {
        Self::build(cloud, true, Some(default_destination()))
    }

    fn with_config(cloud: ScriptedCloud, config: SyncWorkerConfig) -> Self {
        Self::assemble(cloud, true, Some(default_destination()), config)
    }

    fn build(
        cloud: ScriptedCloud,
        connected: bool,
        destination: Option<SyncDestination>,
    ) -> Self {
        Self::assemble(cloud, connected, destination, fast_config())
    }

    fn assemble(
        cloud: ScriptedCloud,
        connected: bool,
        destination: Option<SyncDestination>,
        config: SyncWorkerConfig,
    ) -> Self {
        init_test_logging();
        let settings = Arc::new(MemorySettingsStore::new());
        let store = Arc::new(TaskStore::new(settings));
        let network = Arc::new(TestNetwork::new(connected));
        let generator = Arc::new(TempFileGenerator::new());
        let cloud = Arc::new(cloud);
        let notifier = Arc::new(RecordingNotifier::new());
        let worker = SyncWorker::new(
            config,
            store.clone(),
            network.clone(),
            generator.clone(),
            cloud.clone(),
            notifier.clone(),
            Arc::new(FixedDestination(destination)),
        );
        Self {
            worker,
            store,
            network,
            generator,
            cloud,
            notifier,
        }
    }

    async fn wait_queue_empty(&self) {
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            if self.store.list_all().await.unwrap().is_empty() {
                return;
            }
            assert!(Instant::now() < deadline, "queue never drained");
            sleep(Duration::from_millis(10)).await;
        }
    }

    async fn wait_probes_at_least(&self, n: u32) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while self.network.probe_count() < n {
            assert!(Instant::now() < deadline, "probe cadence stalled");
            sleep(Duration::from_millis(10)).await;
        }
    }

    async fn wait_status(&self, status: WorkerStatus) {
        let deadline = Instant::now() + Duration::from_secs(3);
        while self.worker.status().await != status {
            assert!(Instant::now() < deadline, "worker never reached {status:?}");
            sleep(Duration::from_millis(10)).await;
        }
    }
}

fn default_destination() -> SyncDestination {
    SyncDestination {
        service: CloudService::GoogleDrive,
        folder: RemoteFolder {
            id: Some("folder-default".to_string()),
            path: None,
        },
    }
}

// ---------------------------------------------------------------------
// Scenarios

#[tokio::test]
async fn enqueue_persists_without_processing_while_stopped() {
    let h = Harness::new(ScriptedCloud::succeeding());

    let id = h.worker.enqueue(new_task("s1")).await.unwrap();

    let tasks = h.store.list_all().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, id);
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert_eq!(tasks[0].retry_count, 0);

    sleep(Duration::from_millis(60)).await;
    assert_eq!(h.worker.status().await, WorkerStatus::Stopped);
    assert!(h.cloud.calls().is_empty());
}

#[tokio::test]
async fn successful_task_uploads_and_leaves_queue() {
    let h = Harness::new(ScriptedCloud::succeeding());

    h.worker.start().await;
    h.worker.enqueue(new_task("s1")).await.unwrap();
    h.wait_queue_empty().await;

    let calls = h.cloud.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].service, CloudService::GoogleDrive);
    assert_eq!(calls[0].remote_name, "2024-05-17_scan_s1.pdf");
    assert_eq!(calls[0].folder.id.as_deref(), Some("folder-default"));

    // Generated document is cleaned up after upload
    assert!(!calls[0].local_path.exists());

    // No user-facing noise on the happy path
    assert!(h.notifier.events().is_empty());
}

#[tokio::test]
async fn task_folder_hint_overrides_default_destination() {
    let h = Harness::new(ScriptedCloud::succeeding());

    h.worker.start().await;
    let mut task = new_task("s1");
    task.folder = RemoteFolder {
        id: Some("folder-override".to_string()),
        path: None,
    };
    h.worker.enqueue(task).await.unwrap();
    h.wait_queue_empty().await;

    assert_eq!(
        h.cloud.calls()[0].folder.id.as_deref(),
        Some("folder-override")
    );
}

#[tokio::test]
async fn transient_failures_retry_then_succeed() {
    let h = Harness::new(ScriptedCloud::failing_first(2));

    h.worker.start().await;
    h.worker.enqueue(new_task("s1")).await.unwrap();
    h.wait_queue_empty().await;

    assert_eq!(h.cloud.calls().len(), 3);
    // Soft hint on the first failure only, never a terminal error
    assert_eq!(h.notifier.count(NotificationSeverity::Info), 1);
    assert_eq!(h.notifier.count(NotificationSeverity::Error), 0);
}

#[tokio::test]
async fn exhausted_retries_notify_and_remove() {
    let h = Harness::new(ScriptedCloud::failing_first(u32::MAX));

    h.worker.start().await;
    h.worker.enqueue(new_task("s1")).await.unwrap();
    h.wait_queue_empty().await;

    // max_retry_count bounds total attempts
    assert_eq!(h.cloud.calls().len(), 3);
    assert_eq!(h.notifier.count(NotificationSeverity::Info), 1);

    let errors: Vec<_> = h
        .notifier
        .events()
        .into_iter()
        .filter(|(s, _)| *s == NotificationSeverity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].1.contains("s1"), "message names the scan: {}", errors[0].1);
}

#[tokio::test]
async fn missing_destination_fails_without_retrying() {
    let h = Harness::build(ScriptedCloud::succeeding(), true, None);

    h.worker.start().await;
    h.worker.enqueue(new_task("s1")).await.unwrap();
    h.wait_queue_empty().await;

    // Deterministic failure: no upload attempt, no retry budget spent
    assert!(h.cloud.calls().is_empty());
    assert_eq!(h.generator.call_count(), 0);
    assert_eq!(h.notifier.count(NotificationSeverity::Error), 1);
    assert_eq!(h.notifier.count(NotificationSeverity::Info), 0);
}

#[tokio::test]
async fn invalid_snapshot_fails_without_generating() {
    let h = Harness::new(ScriptedCloud::succeeding());

    h.worker.start().await;
    let mut task = new_task("s1");
    task.snapshot.text = "   ".to_string();
    h.worker.enqueue(task).await.unwrap();
    h.wait_queue_empty().await;

    assert_eq!(h.generator.call_count(), 0);
    assert!(h.cloud.calls().is_empty());
    assert_eq!(h.notifier.count(NotificationSeverity::Error), 1);
}

#[tokio::test]
async fn terminal_failure_does_not_block_later_tasks() {
    let h = Harness::new(ScriptedCloud::succeeding());

    h.worker.start().await;
    let mut bad = new_task("bad");
    bad.snapshot.captured_at = "yesterday".to_string();
    h.worker.enqueue(bad).await.unwrap();
    h.worker.enqueue(new_task("good")).await.unwrap();
    h.wait_queue_empty().await;

    let calls = h.cloud.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].remote_name, "2024-05-17_scan_good.pdf");
}

#[tokio::test]
async fn offline_defers_and_rechecks_until_connected() {
    let h = Harness::build(
        ScriptedCloud::succeeding(),
        false,
        Some(default_destination()),
    );

    h.worker.start().await;
    h.worker.enqueue(new_task("s1")).await.unwrap();

    // Several recheck cycles pass; the task sits untouched
    h.wait_probes_at_least(3).await;
    let tasks = h.store.list_all().await.unwrap();
    assert_eq!(tasks[0].status, TaskStatus::Pending);
    assert_eq!(tasks[0].retry_count, 0);
    assert!(h.cloud.calls().is_empty());

    h.network.set_connected(true);
    h.wait_queue_empty().await;
    assert_eq!(h.cloud.calls().len(), 1);
}

#[tokio::test]
async fn stop_cancels_scheduled_rechecks_and_keeps_queue() {
    let h = Harness::build(
        ScriptedCloud::succeeding(),
        false,
        Some(default_destination()),
    );

    h.worker.start().await;
    h.worker.enqueue(new_task("s1")).await.unwrap();
    h.wait_probes_at_least(2).await;

    h.worker.stop().await;
    sleep(Duration::from_millis(50)).await; // let any in-flight cycle settle
    let settled = h.network.probe_count();

    sleep(Duration::from_millis(120)).await;
    assert_eq!(h.network.probe_count(), settled, "probing continued after stop");

    // The queued task survives for the next start
    let tasks = h.store.list_all().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Pending);
}

#[tokio::test]
async fn pause_gates_processing_and_resume_drains() {
    let h = Harness::new(ScriptedCloud::succeeding());

    h.worker.start().await;
    h.worker.pause().await;
    assert_eq!(h.worker.status().await, WorkerStatus::Paused);

    h.worker.enqueue(new_task("s1")).await.unwrap();
    sleep(Duration::from_millis(80)).await;
    assert!(h.cloud.calls().is_empty());
    assert_eq!(h.store.list_all().await.unwrap().len(), 1);

    h.worker.resume().await;
    h.wait_queue_empty().await;
    assert_eq!(h.cloud.calls().len(), 1);
}

#[tokio::test]
async fn lifecycle_transitions_drive_pause_and_resume() {
    let h = Harness::new(ScriptedCloud::succeeding());
    let (observer, tx) = ChannelLifecycle::new();

    h.worker.start().await;
    let binding = bind_lifecycle(h.worker.clone(), observer).await.unwrap();

    tx.send(LifecycleState::Background).unwrap();
    h.wait_status(WorkerStatus::Paused).await;

    tx.send(LifecycleState::Foreground).unwrap();
    h.wait_status(WorkerStatus::Running).await;

    // After unbinding, transitions no longer reach the worker
    binding.unbind();
    sleep(Duration::from_millis(20)).await;
    let _ = tx.send(LifecycleState::Suspended);
    sleep(Duration::from_millis(50)).await;
    assert_eq!(h.worker.status().await, WorkerStatus::Running);
}

#[tokio::test]
async fn stranded_processing_task_is_recovered_and_drained() {
    let h = Harness::new(ScriptedCloud::succeeding());

    // A previous run died between marking the task processing and
    // persisting the outcome
    let id = h.worker.enqueue(new_task("s1")).await.unwrap();
    h.store
        .update(
            id,
            core_sync::TaskPatch {
                status: Some(TaskStatus::Processing),
                ..core_sync::TaskPatch::default()
            },
        )
        .await
        .unwrap();

    h.worker.start().await;
    h.wait_queue_empty().await;

    let calls = h.cloud.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].remote_name, "2024-05-17_scan_s1.pdf");
}

#[tokio::test]
async fn zero_delay_config_drains_a_burst_of_tasks() {
    let mut config = fast_config();
    config.retry_delays = vec![Duration::ZERO; 3];
    config.pacing_delay = Duration::ZERO;
    config.offline_recheck_delay = Duration::ZERO;
    let h = Harness::with_config(ScriptedCloud::failing_first(2), config);

    h.worker.start().await;
    for i in 0..5 {
        h.worker.enqueue(new_task(&format!("s{i}"))).await.unwrap();
    }
    h.wait_queue_empty().await;

    // 5 successes plus the 2 scripted failures, none lost to a
    // self-cancelled timer
    assert_eq!(h.cloud.calls().len(), 7);
    assert_eq!(h.notifier.count(NotificationSeverity::Error), 0);
}

#[tokio::test]
async fn queue_survives_worker_restart() {
    let h = Harness::build(
        ScriptedCloud::succeeding(),
        false,
        Some(default_destination()),
    );

    h.worker.start().await;
    h.worker.enqueue(new_task("s1")).await.unwrap();
    h.worker.stop().await;

    // Rebuild the pipeline over the same persisted queue, now online
    h.network.set_connected(true);
    h.worker.start().await;
    h.wait_queue_empty().await;
    assert_eq!(h.cloud.calls().len(), 1);
}

// ---------------------------------------------------------------------
// mockall-based interaction checks

mock! {
    Generator {}

    #[async_trait]
    impl DocumentGenerator for Generator {
        async fn generate(
            &self,
            snapshot: &ScanSnapshot,
            format: DocumentFormat,
        ) -> BridgeResult<PathBuf>;
    }
}

#[tokio::test]
async fn generator_receives_frozen_snapshot_and_format() {
    init_test_logging();
    let settings = Arc::new(MemorySettingsStore::new());
    let store = Arc::new(TaskStore::new(settings));
    let cloud = Arc::new(ScriptedCloud::succeeding());
    let notifier = Arc::new(RecordingNotifier::new());

    let out = std::env::temp_dir().join(format!("scansync-mock-{}.txt", Uuid::new_v4()));
    std::fs::write(&out, "generated").unwrap();

    let mut generator = MockGenerator::new();
    let returned = out.clone();
    generator
        .expect_generate()
        .withf(|snapshot, format| {
            snapshot.text == "scanned text" && *format == DocumentFormat::Txt
        })
        .times(1)
        .returning(move |_, _| Ok(returned.clone()));

    let worker = SyncWorker::new(
        fast_config(),
        store.clone(),
        Arc::new(TestNetwork::new(true)),
        Arc::new(generator),
        cloud.clone(),
        notifier,
        Arc::new(FixedDestination(Some(default_destination()))),
    );

    worker.start().await;
    let mut task = new_task("s1");
    task.format = DocumentFormat::Txt;
    worker.enqueue(task).await.unwrap();

    let deadline = Instant::now() + Duration::from_secs(3);
    while !store.list_all().await.unwrap().is_empty() {
        assert!(Instant::now() < deadline, "queue never drained");
        sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(cloud.calls()[0].remote_name, "2024-05-17_scan_s1.txt");
}
