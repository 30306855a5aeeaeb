use crate::{LaunchSpec, SidecarError};
use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncRead;

/// Unique identifier for an OS process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId {
    fn from(pid: u32) -> Self {
        Self(pid)
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a managed process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Process is currently running
    Running,
    /// Process exited on its own; code is None when killed by a signal
    Exited { code: Option<i32> },
    /// Process was forcibly terminated
    Terminated,
    /// Process status could not be determined
    Unknown,
}

impl ProcessStatus {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessStatus::Exited { code } => *code,
            _ => None,
        }
    }
}

/// Result of a termination request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationResult {
    /// Termination request was delivered
    Success,
    /// Process was not found (already exited)
    ProcessNotFound,
    /// Insufficient privileges to signal the process
    AccessDenied,
    /// Operation failed with a specific error message
    Failed(String),
}

/// Information about a running OS process, as reported by the stale scan
#[derive(Debug, Clone)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub command: String,
}

/// Owned read end of a child output stream
pub type OutputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Handle to the managed child process.
///
/// Exactly one live handle exists at a time; it is owned by the lifecycle
/// coordinator for its entire lifetime.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    /// Get the process ID (None if the process has already exited)
    fn pid(&self) -> Option<ProcessId>;

    /// Check if the process is still running (non-blocking)
    async fn is_running(&self) -> bool;

    /// Try to get the exit status without blocking
    async fn try_wait(&mut self) -> Result<Option<ProcessStatus>>;

    /// Wait for the process to exit
    async fn wait(&mut self) -> Result<ProcessStatus>;

    /// Take ownership of the child's standard output. Returns None after the
    /// first call; the stream belongs to exactly one pump.
    fn take_stdout(&mut self) -> Option<OutputStream>;

    /// Take ownership of the child's standard error
    fn take_stderr(&mut self) -> Option<OutputStream>;

    /// Request a polite exit (SIGTERM on Unix)
    async fn terminate_gracefully(&mut self) -> TerminationResult;

    /// Stop the process unconditionally (SIGKILL on Unix)
    async fn force_kill(&mut self) -> TerminationResult;
}

/// Starts the collector child process described by a [`LaunchSpec`].
///
/// Implementations verify the artifact before spawning and hand back control
/// immediately; the child's lifetime is independent of the calling task.
#[async_trait]
pub trait ServiceLauncher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, SidecarError>;
}

/// Single capability behind which platform-specific process enumeration
/// lives; core logic never branches on the platform name directly.
#[async_trait]
pub trait ProcessLister: Send + Sync {
    /// List OS processes whose command line contains `needle`
    async fn list_processes_matching(&self, needle: &str) -> Result<Vec<ProcessInfo>>;
}
