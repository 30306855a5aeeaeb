use crate::cleaner::StaleProcessCleaner;
use crate::health;
use crate::platform::PlatformSidecarFactory;
use crate::probe;
use crate::pump::{OutputPump, StreamKind};
use collector_sidecar_core::{
    ErrorKind, LaunchSpec, ProcessHandle, ProcessLister, ReadinessFlag, ReadinessProbe,
    ServiceLauncher, SidecarConfig, SidecarError, TerminationResult,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// States of the collector lifecycle.
///
/// Success path: `Idle → Cleaning → PortChecking → Launching →
/// AwaitingHealth → Ready`; any startup step can divert to `Failed`.
/// Teardown (`ShuttingDown → Stopped`) is reachable from every state via
/// the external shutdown event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Cleaning,
    PortChecking,
    Launching,
    AwaitingHealth,
    Ready,
    Failed,
    ShuttingDown,
    Stopped,
}

/// Owns the collector child process and drives its start/stop state machine.
///
/// Startup runs synchronously on the caller's task up to `Ready` or
/// `Failed`; the two output pumps keep running in the background for the
/// lifetime of the child. All startup faults are caught here and recorded,
/// never propagated into the host application's own startup. Shutdown is
/// idempotent and best-effort: it clears the readiness flag first, stops the
/// pumps, then escalates from graceful to forced termination on bounded
/// grace periods.
pub struct LifecycleCoordinator {
    config: SidecarConfig,
    launcher: Arc<dyn ServiceLauncher>,
    cleaner: StaleProcessCleaner,
    state: RwLock<LifecycleState>,
    readiness: ReadinessFlag,
    shutdown_signal: CancellationToken,
    pump_signal: CancellationToken,
    process: Mutex<Option<Box<dyn ProcessHandle>>>,
    pumps: Mutex<Vec<OutputPump>>,
    failure: Mutex<Option<SidecarError>>,
    shutdown_started: AtomicBool,
    forced_terminations: AtomicU32,
}

impl LifecycleCoordinator {
    /// Create a coordinator using the platform launcher and process lister
    pub fn new(config: SidecarConfig) -> Result<Self, SidecarError> {
        info!(
            platform = PlatformSidecarFactory::platform_name(),
            "Creating lifecycle coordinator"
        );
        Self::with_parts(
            config,
            PlatformSidecarFactory::create_launcher(),
            PlatformSidecarFactory::create_lister(),
        )
    }

    /// Create a coordinator with explicit launcher and lister implementations
    pub fn with_parts(
        config: SidecarConfig,
        launcher: Arc<dyn ServiceLauncher>,
        lister: Arc<dyn ProcessLister>,
    ) -> Result<Self, SidecarError> {
        config
            .validate()
            .map_err(|e| SidecarError::Configuration(e.to_string()))?;

        // The pumps listen on a child token so a failed startup can stop
        // them without signalling a full shutdown
        let shutdown_signal = CancellationToken::new();
        let pump_signal = shutdown_signal.child_token();

        Ok(Self {
            config,
            launcher,
            cleaner: StaleProcessCleaner::new(lister),
            state: RwLock::new(LifecycleState::Idle),
            readiness: ReadinessFlag::new(),
            shutdown_signal,
            pump_signal,
            process: Mutex::new(None),
            pumps: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            shutdown_started: AtomicBool::new(false),
            forced_terminations: AtomicU32::new(0),
        })
    }

    /// Current lifecycle state
    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Read-only readiness capability for downstream collaborators. Safe to
    /// query from any concurrent context at any time; reads false before
    /// startup and after shutdown begins.
    pub fn readiness(&self) -> ReadinessProbe {
        self.readiness.probe()
    }

    /// Kind of the recorded startup failure, if any
    pub async fn failure_kind(&self) -> Option<ErrorKind> {
        self.failure.lock().await.as_ref().map(|e| e.kind())
    }

    /// Rendered startup failure, if any
    pub async fn failure_message(&self) -> Option<String> {
        self.failure.lock().await.as_ref().map(|e| e.to_string())
    }

    /// How many times graceful termination had to be escalated to force
    pub fn forced_termination_count(&self) -> u32 {
        self.forced_terminations.load(Ordering::SeqCst)
    }

    /// Run the startup sequence; blocks until `Ready` or `Failed` (bounded
    /// by the configured startup timeout).
    ///
    /// A disabled configuration is a silent no-op that leaves the
    /// coordinator `Idle`. Failures are recorded, logged, and absorbed; the
    /// returned state tells the caller how startup ended.
    pub async fn start(&self) -> LifecycleState {
        if !self.config.enabled {
            info!("Embedded collector disabled by configuration");
            return self.state().await;
        }

        if self.state().await != LifecycleState::Idle {
            warn!("Startup already attempted; ignoring duplicate request");
            return self.state().await;
        }

        info!(
            port = self.config.port,
            artifact = %self.config.artifact_path.display(),
            "Starting embedded collector"
        );

        match self.run_startup().await {
            Ok(()) => {
                info!(
                    "Embedded collector ready at http://{}:{}",
                    self.config.host, self.config.port
                );
            }
            Err(e) => {
                error!(error = %e, "Embedded collector startup failed");
                // A shutdown that raced the startup owns the terminal state
                if !self.shutdown_started.load(Ordering::SeqCst) {
                    self.set_state(LifecycleState::Failed).await;
                }
                *self.failure.lock().await = Some(e);
            }
        }

        self.state().await
    }

    async fn run_startup(&self) -> Result<(), SidecarError> {
        self.set_state(LifecycleState::Cleaning).await;
        self.cleaner
            .scan_and_report(&self.config.service_name)
            .await;

        self.set_state(LifecycleState::PortChecking).await;
        if !probe::is_port_available(&self.config.host, self.config.port).await {
            return Err(SidecarError::PortOccupied(self.config.port));
        }

        self.set_state(LifecycleState::Launching).await;
        let spec = LaunchSpec::from_config(&self.config);
        info!(command = %spec.command_line(), "Launching collector");
        let mut handle = self.launcher.launch(&spec).await?;

        // Pumps start before the health wait so startup output is mirrored
        // while we poll
        let mut pumps = Vec::new();
        if let Some(stdout) = handle.take_stdout() {
            pumps.push(OutputPump::spawn(
                stdout,
                StreamKind::Stdout,
                self.config.service_name.clone(),
                self.pump_signal.clone(),
            ));
        }
        if let Some(stderr) = handle.take_stderr() {
            pumps.push(OutputPump::spawn(
                stderr,
                StreamKind::Stderr,
                self.config.service_name.clone(),
                self.pump_signal.clone(),
            ));
        }
        *self.pumps.lock().await = pumps;

        self.set_state(LifecycleState::AwaitingHealth).await;
        let waited = tokio::select! {
            res = health::await_ready(
                &*handle,
                &self.config.host,
                self.config.port,
                self.config.startup_timeout_secs,
            ) => res,
            _ = self.shutdown_signal.cancelled() => {
                Err(SidecarError::ShutdownError(
                    "shutdown requested during startup".to_string(),
                ))
            }
        };

        match waited {
            Ok(()) => {
                // Re-check the latch: a shutdown may have completed between
                // the health wait and this point, and must not be followed
                // by a ready flag it can no longer clear
                if self.shutdown_started.load(Ordering::SeqCst) {
                    let e = SidecarError::ShutdownError(
                        "shutdown requested during startup".to_string(),
                    );
                    return Err(self.finalize_failed_startup(handle, e).await);
                }
                *self.process.lock().await = Some(handle);
                self.readiness.mark_ready();
                self.set_state(LifecycleState::Ready).await;
                Ok(())
            }
            Err(e) => Err(self.finalize_failed_startup(handle, e).await),
        }
    }

    /// Capture the exit code and the buffered trailing output before the
    /// `Failed` state becomes terminal. A child that is unhealthy but still
    /// alive stays owned so a later shutdown can reap it.
    async fn finalize_failed_startup(
        &self,
        mut handle: Box<dyn ProcessHandle>,
        err: SidecarError,
    ) -> SidecarError {
        let exit_code = match handle.try_wait().await {
            Ok(Some(status)) => status.exit_code(),
            _ => None,
        };

        let err = match err {
            SidecarError::ProcessCrashed { .. } => SidecarError::ProcessCrashed { exit_code },
            other => other,
        };

        if let Some(code) = exit_code {
            error!(exit_code = code, "Collector process exited during startup");
        }

        // Stop the pumps before joining them; a still-alive child never
        // closes its streams, so they would not reach EOF on their own
        self.pump_signal.cancel();
        let pumps = std::mem::take(&mut *self.pumps.lock().await);
        for pump in pumps {
            for line in pump.drain().await {
                error!("{} output: {}", self.config.service_name, line);
            }
        }

        if self.shutdown_started.load(Ordering::SeqCst) {
            // A concurrent shutdown may already have looked for the handle
            // and found nothing; reap here instead of storing
            self.stop_process(handle.as_mut()).await;
        } else {
            *self.process.lock().await = Some(handle);
        }
        err
    }

    /// Run the teardown sequence. Idempotent: concurrent or repeated calls
    /// result in exactly one teardown; later calls return immediately.
    /// Faults here are logged, never propagated into the host's shutdown.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            info!("Shutdown already in progress; ignoring duplicate request");
            return;
        }

        info!("Stopping embedded collector");

        // Readers must see not-ready before the service disappears
        self.readiness.mark_not_ready();
        self.set_state(LifecycleState::ShuttingDown).await;
        self.shutdown_signal.cancel();

        let pumps = std::mem::take(&mut *self.pumps.lock().await);
        for pump in pumps {
            pump.drain().await;
        }

        if let Some(mut handle) = self.process.lock().await.take() {
            self.stop_process(handle.as_mut()).await;
        } else {
            info!("No collector process to stop");
        }

        self.set_state(LifecycleState::Stopped).await;
        info!("Embedded collector stopped");
    }

    async fn stop_process(&self, handle: &mut dyn ProcessHandle) {
        if !handle.is_running().await {
            let code = match handle.try_wait().await {
                Ok(Some(status)) => status.exit_code(),
                _ => None,
            };
            info!(exit_code = ?code, "Collector process already exited");
            return;
        }

        match handle.terminate_gracefully().await {
            TerminationResult::Success => {}
            TerminationResult::ProcessNotFound => {
                info!("Collector process already gone");
                return;
            }
            other => warn!(result = ?other, "Graceful termination request failed"),
        }

        match tokio::time::timeout(self.config.graceful_shutdown_timeout(), handle.wait()).await {
            Ok(Ok(status)) => {
                info!(exit_code = ?status.exit_code(), "Collector stopped gracefully");
                return;
            }
            Ok(Err(e)) => warn!(error = %e, "Error while waiting for collector exit"),
            Err(_) => warn!(
                "Collector still running after {}s; forcing termination",
                self.config.graceful_shutdown_timeout_secs
            ),
        }

        self.forced_terminations.fetch_add(1, Ordering::SeqCst);
        match handle.force_kill().await {
            TerminationResult::Success | TerminationResult::ProcessNotFound => {}
            other => {
                error!(result = ?other, "Forced termination failed");
                return;
            }
        }

        match tokio::time::timeout(self.config.forced_shutdown_timeout(), handle.wait()).await {
            Ok(_) => info!("Collector stopped after forced termination"),
            Err(_) => {
                error!(error = %SidecarError::ShutdownTimeout, "Collector still running after forced termination");
            }
        }
    }

    async fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().await;

        // Once the shutdown latch flips, only the teardown path may
        // transition; a startup racing the shutdown must not overwrite
        // its terminal state
        let teardown = matches!(
            next,
            LifecycleState::ShuttingDown | LifecycleState::Stopped
        );
        if self.shutdown_started.load(Ordering::SeqCst) && !teardown {
            info!(from = ?*state, to = ?next, "Lifecycle transition suppressed by shutdown");
            return;
        }

        info!(from = ?*state, to = ?next, "Lifecycle transition");
        *state = next;
    }
}
