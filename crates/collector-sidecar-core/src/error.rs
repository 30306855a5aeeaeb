use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for the embedded collector lifecycle.
///
/// Every startup fault is caught at the coordinator boundary and recorded as
/// one of these kinds; none of them are ever propagated into the host
/// application's own startup or shutdown sequence.
#[derive(Error, Debug)]
pub enum SidecarError {
    #[error("Collector artifact not found or empty: {0}")]
    ArtifactMissing(PathBuf),

    #[error("Port {0} is already occupied")]
    PortOccupied(u16),

    #[error("Failed to spawn collector process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Collector did not become ready within {0} seconds")]
    HealthTimeout(u64),

    #[error("Collector process exited during startup (exit code: {exit_code:?})")]
    ProcessCrashed { exit_code: Option<i32> },

    #[error("Collector did not stop within the grace period")]
    ShutdownTimeout,

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Named discriminant of [`SidecarError`], comparable in tests and by
/// downstream callers that only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ArtifactMissing,
    PortOccupied,
    SpawnFailed,
    HealthTimeout,
    ProcessCrashed,
    ShutdownTimeout,
    ShutdownError,
    Configuration,
    Other,
}

impl SidecarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SidecarError::ArtifactMissing(_) => ErrorKind::ArtifactMissing,
            SidecarError::PortOccupied(_) => ErrorKind::PortOccupied,
            SidecarError::SpawnFailed(_) => ErrorKind::SpawnFailed,
            SidecarError::HealthTimeout(_) => ErrorKind::HealthTimeout,
            SidecarError::ProcessCrashed { .. } => ErrorKind::ProcessCrashed,
            SidecarError::ShutdownTimeout => ErrorKind::ShutdownTimeout,
            SidecarError::ShutdownError(_) => ErrorKind::ShutdownError,
            SidecarError::Configuration(_) => ErrorKind::Configuration,
            SidecarError::Other(_) => ErrorKind::Other,
        }
    }

    /// Check if this error occurred during the startup path
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ArtifactMissing
                | ErrorKind::PortOccupied
                | ErrorKind::SpawnFailed
                | ErrorKind::HealthTimeout
                | ErrorKind::ProcessCrashed
        )
    }

    /// Check if this error is best-effort only (logged, never fatal)
    pub fn is_shutdown_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ShutdownTimeout | ErrorKind::ShutdownError
        )
    }
}
