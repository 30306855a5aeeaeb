use collector_sidecar_core::OutputStream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Lines kept for the failure dump
const TAIL_CAPACITY: usize = 50;

/// Startup markers and noise worth mirroring from the collector's stdout
const STDOUT_MARKERS: &[&str] = &["Started", "Serving HTTP", "ERROR", "WARN"];

/// Only genuine faults are mirrored from stderr
const STDERR_MARKERS: &[&str] = &["ERROR", "Exception", "Failed"];

/// Which child stream a pump drains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn markers(self) -> &'static [&'static str] {
        match self {
            StreamKind::Stdout => STDOUT_MARKERS,
            StreamKind::Stderr => STDERR_MARKERS,
        }
    }

    fn label(self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

/// Background task that drains one child output stream line by line.
///
/// Lines matching the stream's allow-list are forwarded to the log (info for
/// stdout, error for stderr); everything else is dropped to avoid flooding,
/// but retained in a bounded tail buffer so the coordinator can dump recent
/// output when startup fails. The task ends at end-of-stream or when the
/// shutdown token fires; it never keeps the host process alive.
pub struct OutputPump {
    task: JoinHandle<()>,
    tail: Arc<Mutex<VecDeque<String>>>,
}

impl OutputPump {
    pub fn spawn(
        stream: OutputStream,
        kind: StreamKind,
        service: String,
        shutdown: CancellationToken,
    ) -> Self {
        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(TAIL_CAPACITY)));
        let task = tokio::spawn(pump_loop(stream, kind, service, shutdown, tail.clone()));
        Self { task, tail }
    }

    /// Wait for the pump task to finish and hand back the buffered tail
    pub async fn drain(self) -> Vec<String> {
        let OutputPump { task, tail } = self;
        let _ = task.await;
        let buffered = tail.lock().unwrap().iter().cloned().collect();
        buffered
    }
}

async fn pump_loop(
    stream: OutputStream,
    kind: StreamKind,
    service: String,
    shutdown: CancellationToken,
    tail: Arc<Mutex<VecDeque<String>>>,
) {
    let mut lines = BufReader::new(stream).lines();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    {
                        let mut tail = tail.lock().unwrap();
                        if tail.len() == TAIL_CAPACITY {
                            tail.pop_front();
                        }
                        tail.push_back(line.clone());
                    }

                    if kind.markers().iter().any(|marker| line.contains(marker)) {
                        match kind {
                            StreamKind::Stdout => info!("{}: {}", service, line),
                            StreamKind::Stderr => error!("{}: {}", service, line),
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    if !shutdown.is_cancelled() {
                        warn!(stream = kind.label(), error = %e, "Error reading collector output");
                    }
                    break;
                }
            }
        }
    }
}
