use collector_sidecar_core::ProcessLister;
use std::sync::Arc;
use tracing::{debug, warn};

/// Best-effort scan for already-running collector instances before launch.
///
/// Advisory only: matches are logged so an operator can see the conflict,
/// but nothing is terminated. Scan errors are swallowed; this step never
/// blocks or fails the startup transition.
pub struct StaleProcessCleaner {
    lister: Arc<dyn ProcessLister>,
}

impl StaleProcessCleaner {
    pub fn new(lister: Arc<dyn ProcessLister>) -> Self {
        Self { lister }
    }

    /// Report processes whose command line mentions `needle`; returns how
    /// many were found
    pub async fn scan_and_report(&self, needle: &str) -> usize {
        match self.lister.list_processes_matching(needle).await {
            Ok(matches) => {
                if matches.is_empty() {
                    debug!(needle = %needle, "No existing collector processes found");
                }
                for info in &matches {
                    warn!(
                        pid = %info.pid,
                        command = %info.command,
                        "Found existing collector process (left running)"
                    );
                }
                matches.len()
            }
            Err(e) => {
                warn!(error = %e, "Stale process scan failed");
                0
            }
        }
    }
}
