#[cfg(unix)]
mod unix_impl {
    use anyhow::Result;
    use async_trait::async_trait;
    use collector_sidecar_core::{
        LaunchSpec, OutputStream, ProcessHandle, ProcessId, ProcessInfo, ProcessLister,
        ProcessStatus, ServiceLauncher, SidecarError, TerminationResult,
    };
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid as NixPid;
    use std::path::PathBuf;
    use std::process::Stdio;
    use sysinfo::System;
    use tokio::process::{Child, Command};
    use tracing::{info, warn};

    /// Unix-specific handle to the collector child process
    pub struct UnixProcessHandle {
        child: Child,
    }

    impl UnixProcessHandle {
        pub fn new(child: Child) -> Self {
            Self { child }
        }
    }

    #[async_trait]
    impl ProcessHandle for UnixProcessHandle {
        fn pid(&self) -> Option<ProcessId> {
            self.child.id().map(ProcessId::from)
        }

        async fn is_running(&self) -> bool {
            if let Some(pid) = self.pid() {
                let nix_pid = NixPid::from_raw(pid.0 as i32);
                // Signal 0 delivers nothing but reports whether the process exists
                signal::kill(nix_pid, None).is_ok()
            } else {
                false
            }
        }

        async fn try_wait(&mut self) -> Result<Option<ProcessStatus>> {
            match self.child.try_wait()? {
                Some(status) => Ok(Some(ProcessStatus::Exited {
                    code: status.code(),
                })),
                None => Ok(None),
            }
        }

        async fn wait(&mut self) -> Result<ProcessStatus> {
            let status = self.child.wait().await?;
            Ok(ProcessStatus::Exited {
                code: status.code(),
            })
        }

        fn take_stdout(&mut self) -> Option<OutputStream> {
            self.child
                .stdout
                .take()
                .map(|stream| Box::new(stream) as OutputStream)
        }

        fn take_stderr(&mut self) -> Option<OutputStream> {
            self.child
                .stderr
                .take()
                .map(|stream| Box::new(stream) as OutputStream)
        }

        async fn terminate_gracefully(&mut self) -> TerminationResult {
            if let Some(pid) = self.pid() {
                let nix_pid = NixPid::from_raw(pid.0 as i32);

                match signal::kill(nix_pid, Signal::SIGTERM) {
                    Ok(()) => {
                        info!("Sent SIGTERM to process {}", pid);
                        TerminationResult::Success
                    }
                    Err(nix::errno::Errno::ESRCH) => {
                        info!("Process {} not found (already terminated)", pid);
                        TerminationResult::ProcessNotFound
                    }
                    Err(nix::errno::Errno::EPERM) => {
                        warn!("Permission denied to terminate process {}", pid);
                        TerminationResult::AccessDenied
                    }
                    Err(e) => {
                        warn!("Failed to send SIGTERM to process {}: {}", pid, e);
                        TerminationResult::Failed(format!("SIGTERM failed: {e}"))
                    }
                }
            } else {
                TerminationResult::ProcessNotFound
            }
        }

        async fn force_kill(&mut self) -> TerminationResult {
            if let Some(pid) = self.pid() {
                let nix_pid = NixPid::from_raw(pid.0 as i32);

                match signal::kill(nix_pid, Signal::SIGKILL) {
                    Ok(()) => {
                        info!("Sent SIGKILL to process {}", pid);
                        // Also reap through the handle so no zombie remains
                        if let Err(e) = self.child.kill().await {
                            warn!("Handle kill cleanup failed: {}", e);
                        }
                        TerminationResult::Success
                    }
                    Err(nix::errno::Errno::ESRCH) => {
                        info!("Process {} not found (already terminated)", pid);
                        TerminationResult::ProcessNotFound
                    }
                    Err(nix::errno::Errno::EPERM) => {
                        warn!("Permission denied to kill process {}", pid);
                        TerminationResult::AccessDenied
                    }
                    Err(e) => {
                        warn!("Failed to send SIGKILL to process {}: {}", pid, e);
                        TerminationResult::Failed(format!("SIGKILL failed: {e}"))
                    }
                }
            } else {
                TerminationResult::ProcessNotFound
            }
        }
    }

    /// Unix launcher for the collector child process
    #[derive(Default)]
    pub struct UnixServiceLauncher;

    impl UnixServiceLauncher {
        pub fn new() -> Self {
            Self
        }

        /// Artifact location as seen from the host process. A relative
        /// artifact path resolves against the child's working directory,
        /// matching how the child itself will resolve it.
        fn artifact_on_disk(spec: &LaunchSpec) -> PathBuf {
            match (&spec.working_directory, spec.artifact_path.is_relative()) {
                (Some(dir), true) => dir.join(&spec.artifact_path),
                _ => spec.artifact_path.clone(),
            }
        }
    }

    #[async_trait]
    impl ServiceLauncher for UnixServiceLauncher {
        async fn launch(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>, SidecarError> {
            let artifact = Self::artifact_on_disk(spec);
            match tokio::fs::metadata(&artifact).await {
                Ok(meta) if meta.len() > 0 => {
                    info!(
                        artifact = %artifact.display(),
                        size = meta.len(),
                        "Collector artifact found"
                    );
                }
                _ => {
                    warn!(artifact = %artifact.display(), "Collector artifact missing or empty");
                    return Err(SidecarError::ArtifactMissing(artifact));
                }
            }

            let mut cmd = Command::new(&spec.program);
            cmd.args(&spec.args);

            if let Some(dir) = &spec.working_directory {
                cmd.current_dir(dir);
            }

            for (key, value) in &spec.env {
                cmd.env(key, value);
            }

            // Keep the streams separate so each can be filtered independently
            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());

            // New process group: the child's lifetime is independent of the
            // spawning task and its signals
            cmd.process_group(0);

            let child = cmd
                .spawn()
                .map_err(SidecarError::SpawnFailed)?;

            if let Some(pid) = child.id() {
                info!(pid = %pid, command = %spec.command_line(), "Spawned collector process");
            }

            Ok(Box::new(UnixProcessHandle::new(child)))
        }
    }

    /// Process enumeration backed by sysinfo
    pub struct UnixProcessLister {
        system: std::sync::Mutex<System>,
    }

    impl Default for UnixProcessLister {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UnixProcessLister {
        pub fn new() -> Self {
            Self {
                system: std::sync::Mutex::new(System::new()),
            }
        }
    }

    #[async_trait]
    impl ProcessLister for UnixProcessLister {
        async fn list_processes_matching(&self, needle: &str) -> Result<Vec<ProcessInfo>> {
            let mut system = self.system.lock().unwrap();
            system.refresh_processes_specifics(
                sysinfo::ProcessesToUpdate::All,
                true,
                sysinfo::ProcessRefreshKind::default(),
            );

            let mut matches = Vec::new();
            for (pid, process) in system.processes() {
                let command = process
                    .cmd()
                    .iter()
                    .map(|part| part.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join(" ");

                if command.contains(needle) {
                    matches.push(ProcessInfo {
                        pid: ProcessId(pid.as_u32()),
                        command,
                    });
                }
            }

            Ok(matches)
        }
    }

}

// Re-export the Unix implementation when on Unix systems
#[cfg(unix)]
pub use unix_impl::{UnixProcessHandle, UnixProcessLister, UnixServiceLauncher};

// Provide stub implementations for non-Unix systems
#[cfg(not(unix))]
pub struct UnixProcessHandle;

#[cfg(not(unix))]
#[derive(Default)]
pub struct UnixServiceLauncher;

#[cfg(not(unix))]
impl UnixServiceLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(unix))]
#[derive(Default)]
pub struct UnixProcessLister;

#[cfg(not(unix))]
impl UnixProcessLister {
    pub fn new() -> Self {
        Self
    }
}
