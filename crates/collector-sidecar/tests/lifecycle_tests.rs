use anyhow::Result;
use async_trait::async_trait;
use collector_sidecar::{
    ErrorKind, LaunchSpec, LifecycleCoordinator, LifecycleState, OutputStream, ProcessHandle,
    ProcessId, ProcessInfo, ProcessLister, ProcessStatus, ServiceLauncher, SidecarConfig,
    SidecarError, TerminationResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_file(true)
        .with_thread_ids(false)
        .with_target(false)
        .with_line_number(true)
        .try_init();
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn test_config(port: u16) -> SidecarConfig {
    SidecarConfig::builder()
        .port(port)
        .startup_timeout_secs(5u64)
        .graceful_shutdown_timeout_secs(1u64)
        .forced_shutdown_timeout_secs(1u64)
        .build()
        .unwrap()
}

/// Shared observable state of a fake collector process
#[derive(Default)]
struct FakeProcess {
    alive: AtomicBool,
    honor_graceful: AtomicBool,
    exit_code: std::sync::Mutex<Option<i32>>,
    graceful_calls: AtomicU32,
    forced_calls: AtomicU32,
}

impl FakeProcess {
    fn honoring_graceful() -> Arc<Self> {
        let process = Arc::new(Self::default());
        process.honor_graceful.store(true, Ordering::SeqCst);
        process
    }

    fn ignoring_graceful() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn die(&self, code: i32) {
        *self.exit_code.lock().unwrap() = Some(code);
        self.alive.store(false, Ordering::SeqCst);
    }
}

/// Stdout handed to a fake handle: canned bytes reach EOF immediately, a
/// live duplex stream stays open like a running child's pipe
enum FakeStdout {
    Bytes(Vec<u8>),
    Stream(tokio::io::DuplexStream),
}

struct FakeHandle {
    inner: Arc<FakeProcess>,
    stdout: Option<FakeStdout>,
}

#[async_trait]
impl ProcessHandle for FakeHandle {
    fn pid(&self) -> Option<ProcessId> {
        self.inner
            .alive
            .load(Ordering::SeqCst)
            .then_some(ProcessId(4242))
    }

    async fn is_running(&self) -> bool {
        self.inner.alive.load(Ordering::SeqCst)
    }

    async fn try_wait(&mut self) -> Result<Option<ProcessStatus>> {
        if self.inner.alive.load(Ordering::SeqCst) {
            Ok(None)
        } else {
            Ok(Some(ProcessStatus::Exited {
                code: *self.inner.exit_code.lock().unwrap(),
            }))
        }
    }

    async fn wait(&mut self) -> Result<ProcessStatus> {
        while self.inner.alive.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        Ok(ProcessStatus::Exited {
            code: *self.inner.exit_code.lock().unwrap(),
        })
    }

    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.stdout.take().map(|source| match source {
            FakeStdout::Bytes(bytes) => Box::new(std::io::Cursor::new(bytes)) as OutputStream,
            FakeStdout::Stream(stream) => Box::new(stream) as OutputStream,
        })
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        None
    }

    async fn terminate_gracefully(&mut self) -> TerminationResult {
        self.inner.graceful_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.honor_graceful.load(Ordering::SeqCst) {
            self.inner.die(0);
        }
        TerminationResult::Success
    }

    async fn force_kill(&mut self) -> TerminationResult {
        self.inner.forced_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.die(-9);
        TerminationResult::Success
    }
}

/// Launcher that hands out a fake process and optionally simulates the
/// collector binding its port a moment after spawn
struct FakeLauncher {
    process: Arc<FakeProcess>,
    stdout: std::sync::Mutex<Option<FakeStdout>>,
    bind_port: Option<u16>,
    bind_delay: Duration,
}

impl FakeLauncher {
    fn new(process: Arc<FakeProcess>) -> Self {
        Self {
            process,
            stdout: std::sync::Mutex::new(None),
            bind_port: None,
            bind_delay: Duration::from_millis(200),
        }
    }

    fn binding(mut self, port: u16) -> Self {
        self.bind_port = Some(port);
        self
    }

    fn with_stdout(self, content: &str) -> Self {
        *self.stdout.lock().unwrap() = Some(FakeStdout::Bytes(content.as_bytes().to_vec()));
        self
    }

    fn with_live_stdout(self, stream: tokio::io::DuplexStream) -> Self {
        *self.stdout.lock().unwrap() = Some(FakeStdout::Stream(stream));
        self
    }
}

#[async_trait]
impl ServiceLauncher for FakeLauncher {
    async fn launch(&self, _spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, SidecarError> {
        self.process.alive.store(true, Ordering::SeqCst);

        if let Some(port) = self.bind_port {
            let delay = self.bind_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
                std::future::pending::<()>().await
            });
        }

        Ok(Box::new(FakeHandle {
            inner: self.process.clone(),
            stdout: self.stdout.lock().unwrap().take(),
        }))
    }
}

/// Launcher for paths that must never reach the spawn step
struct UnreachableLauncher;

#[async_trait]
impl ServiceLauncher for UnreachableLauncher {
    async fn launch(&self, _spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, SidecarError> {
        panic!("launch must not be reached");
    }
}

struct EmptyLister;

#[async_trait]
impl ProcessLister for EmptyLister {
    async fn list_processes_matching(&self, _needle: &str) -> Result<Vec<ProcessInfo>> {
        Ok(Vec::new())
    }
}

fn coordinator_with(
    config: SidecarConfig,
    launcher: impl ServiceLauncher + 'static,
) -> LifecycleCoordinator {
    LifecycleCoordinator::with_parts(config, Arc::new(launcher), Arc::new(EmptyLister)).unwrap()
}

#[tokio::test]
async fn test_happy_path_reaches_ready() {
    init_tracing();
    let port = free_port();
    let process = FakeProcess::honoring_graceful();
    let launcher = FakeLauncher::new(process.clone())
        .binding(port)
        .with_stdout("Started ZipkinServer in 1.2 seconds\n");
    let coordinator = Arc::new(coordinator_with(test_config(port), launcher));

    assert!(!coordinator.readiness().is_ready());
    assert_eq!(coordinator.start().await, LifecycleState::Ready);

    // Readiness is observable from other tasks
    let probe = coordinator.readiness();
    let seen = tokio::spawn(async move { probe.is_ready() }).await.unwrap();
    assert!(seen);

    coordinator.shutdown().await;
    assert_eq!(coordinator.state().await, LifecycleState::Stopped);
    assert!(!coordinator.readiness().is_ready());
    assert_eq!(coordinator.forced_termination_count(), 0);
}

#[tokio::test]
async fn test_missing_artifact_fails_before_spawn() {
    init_tracing();
    let mut config = test_config(free_port());
    config.artifact_path = std::path::PathBuf::from("does/not/exist.jar");

    // The real platform launcher performs the artifact check
    let coordinator = LifecycleCoordinator::new(config).unwrap();

    assert_eq!(coordinator.start().await, LifecycleState::Failed);
    assert_eq!(
        coordinator.failure_kind().await,
        Some(ErrorKind::ArtifactMissing)
    );
    assert!(!coordinator.readiness().is_ready());
}

#[tokio::test]
async fn test_occupied_port_fails_before_spawn() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let coordinator = coordinator_with(test_config(port), UnreachableLauncher);

    assert_eq!(coordinator.start().await, LifecycleState::Failed);
    assert_eq!(
        coordinator.failure_kind().await,
        Some(ErrorKind::PortOccupied)
    );
    assert!(!coordinator.readiness().is_ready());
}

#[tokio::test]
async fn test_crash_during_health_wait_fails_fast_with_exit_code() {
    init_tracing();
    let port = free_port();
    let process = FakeProcess::ignoring_graceful();
    let launcher = FakeLauncher::new(process.clone())
        .with_stdout("Exception in thread main: port bind refused\n");

    let mut config = test_config(port);
    config.startup_timeout_secs = 30;
    let coordinator = coordinator_with(config, launcher);

    let crasher = {
        let process = process.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            process.die(1);
        })
    };

    let started = Instant::now();
    assert_eq!(coordinator.start().await, LifecycleState::Failed);
    crasher.await.unwrap();

    // Fast-fail, nowhere near the 30s bound
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        coordinator.failure_kind().await,
        Some(ErrorKind::ProcessCrashed)
    );
    let message = coordinator.failure_message().await.unwrap();
    assert!(message.contains("Some(1)"), "message: {message}");
    assert!(!coordinator.readiness().is_ready());
}

#[tokio::test]
async fn test_health_timeout_without_crash() {
    init_tracing();
    let port = free_port();
    let process = FakeProcess::ignoring_graceful();
    let launcher = FakeLauncher::new(process.clone());

    let mut config = test_config(port);
    config.startup_timeout_secs = 2;
    let coordinator = coordinator_with(config, launcher);

    let started = Instant::now();
    assert_eq!(coordinator.start().await, LifecycleState::Failed);
    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(
        coordinator.failure_kind().await,
        Some(ErrorKind::HealthTimeout)
    );

    // The still-alive child remains owned and is reaped at shutdown
    coordinator.shutdown().await;
    assert_eq!(coordinator.state().await, LifecycleState::Stopped);
    assert_eq!(process.graceful_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_health_timeout_returns_while_child_output_stays_open() {
    init_tracing();
    // A running child keeps its stdout pipe open; the failure path must not
    // wait for an EOF that never comes
    let (writer, reader) = tokio::io::duplex(1024);
    let process = FakeProcess::ignoring_graceful();
    let launcher = FakeLauncher::new(process.clone()).with_live_stdout(reader);

    let mut config = test_config(free_port());
    config.startup_timeout_secs = 2;
    let coordinator = coordinator_with(config, launcher);

    let state = tokio::time::timeout(Duration::from_secs(8), coordinator.start())
        .await
        .expect("start() must return within the bounded startup timeout");
    assert_eq!(state, LifecycleState::Failed);
    assert_eq!(
        coordinator.failure_kind().await,
        Some(ErrorKind::HealthTimeout)
    );
    drop(writer);
}

#[tokio::test]
async fn test_shutdown_during_startup_ends_stopped() {
    init_tracing();
    // Port never binds, so startup sits in the health wait until the
    // shutdown arrives
    let process = FakeProcess::honoring_graceful();
    let launcher = FakeLauncher::new(process.clone());

    let mut config = test_config(free_port());
    config.startup_timeout_secs = 30;
    let coordinator = Arc::new(coordinator_with(config, launcher));

    let starter = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.start().await })
    };
    tokio::time::sleep(Duration::from_millis(300)).await;
    coordinator.shutdown().await;
    let ended = starter.await.unwrap();

    // The racing startup must not overwrite the terminal state, and the
    // locally held child still gets reaped
    assert_eq!(ended, LifecycleState::Stopped);
    assert_eq!(coordinator.state().await, LifecycleState::Stopped);
    assert!(!coordinator.readiness().is_ready());
    assert_eq!(process.graceful_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_graceful_shutdown_does_not_escalate() {
    init_tracing();
    let port = free_port();
    let process = FakeProcess::honoring_graceful();
    let launcher = FakeLauncher::new(process.clone()).binding(port);
    let coordinator = coordinator_with(test_config(port), launcher);

    assert_eq!(coordinator.start().await, LifecycleState::Ready);
    coordinator.shutdown().await;

    assert_eq!(coordinator.state().await, LifecycleState::Stopped);
    assert_eq!(process.graceful_calls.load(Ordering::SeqCst), 1);
    assert_eq!(process.forced_calls.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.forced_termination_count(), 0);
}

#[tokio::test]
async fn test_forced_shutdown_escalation() {
    init_tracing();
    let port = free_port();
    let process = FakeProcess::ignoring_graceful();
    let launcher = FakeLauncher::new(process.clone()).binding(port);
    let coordinator = coordinator_with(test_config(port), launcher);

    assert_eq!(coordinator.start().await, LifecycleState::Ready);
    coordinator.shutdown().await;

    assert_eq!(coordinator.state().await, LifecycleState::Stopped);
    assert_eq!(process.graceful_calls.load(Ordering::SeqCst), 1);
    assert_eq!(process.forced_calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.forced_termination_count(), 1);
}

#[tokio::test]
async fn test_shutdown_is_idempotent_under_concurrency() {
    init_tracing();
    let port = free_port();
    let process = FakeProcess::honoring_graceful();
    let launcher = FakeLauncher::new(process.clone()).binding(port);
    let coordinator = Arc::new(coordinator_with(test_config(port), launcher));

    assert_eq!(coordinator.start().await, LifecycleState::Ready);

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.shutdown().await })
    };
    let second = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.shutdown().await })
    };
    let (a, b) = tokio::join!(first, second);
    a.unwrap();
    b.unwrap();

    // Exactly one teardown sequence ran
    assert_eq!(process.graceful_calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.state().await, LifecycleState::Stopped);
}

#[tokio::test]
async fn test_disabled_config_is_a_silent_noop() {
    init_tracing();
    let mut config = test_config(free_port());
    config.enabled = false;
    let coordinator = coordinator_with(config, UnreachableLauncher);

    assert_eq!(coordinator.start().await, LifecycleState::Idle);
    assert!(!coordinator.readiness().is_ready());

    // Shutdown from Idle latches the terminal state without a process
    coordinator.shutdown().await;
    assert_eq!(coordinator.state().await, LifecycleState::Stopped);
}

#[tokio::test]
async fn test_duplicate_start_is_ignored() {
    init_tracing();
    let port = free_port();
    let process = FakeProcess::honoring_graceful();
    let launcher = FakeLauncher::new(process.clone()).binding(port);
    let coordinator = coordinator_with(test_config(port), launcher);

    assert_eq!(coordinator.start().await, LifecycleState::Ready);
    assert_eq!(coordinator.start().await, LifecycleState::Ready);

    coordinator.shutdown().await;
    assert_eq!(process.graceful_calls.load(Ordering::SeqCst), 1);
}
