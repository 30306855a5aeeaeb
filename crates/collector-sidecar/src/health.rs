use crate::probe;
use backon::{BackoffBuilder, ConstantBuilder, Retryable};
use collector_sidecar_core::{ErrorKind, ProcessHandle, SidecarError};
use std::time::Duration;
use tracing::{debug, info};

/// Fixed cadence between readiness checks
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wait for the collector to become ready, polling once per second up to
/// `timeout_secs` iterations.
///
/// Each iteration first checks process liveness (cheap, catches a crash on
/// startup immediately instead of waiting out the whole timeout) and then
/// probes the port; an occupied port is the readiness signal since the
/// collector offers no richer health endpoint here.
///
/// Returns `ProcessCrashed` (exit code filled in by the caller, which owns
/// the mutable handle) on a dead process and `HealthTimeout` on exhaustion.
pub(crate) async fn await_ready(
    handle: &dyn ProcessHandle,
    host: &str,
    port: u16,
    timeout_secs: u64,
) -> Result<(), SidecarError> {
    info!(
        port = port,
        timeout_secs = timeout_secs,
        "Waiting for collector to become ready"
    );

    let cadence = ConstantBuilder::default()
        .with_delay(POLL_INTERVAL)
        .with_max_times(timeout_secs as usize)
        .build();

    let check = || async {
        if !handle.is_running().await {
            return Err(SidecarError::ProcessCrashed { exit_code: None });
        }

        if probe::is_port_available(host, port).await {
            debug!(port = port, "Collector not listening yet");
            // Retryable marker; surfaces unchanged once the cadence is spent
            Err(SidecarError::HealthTimeout(timeout_secs))
        } else {
            info!(port = port, "Collector is ready");
            Ok(())
        }
    };

    check
        .retry(cadence)
        .when(|e: &SidecarError| e.kind() == ErrorKind::HealthTimeout)
        .await
}
