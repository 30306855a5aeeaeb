#[cfg(windows)]
mod windows_impl {
    use anyhow::Result;
    use async_trait::async_trait;
    use collector_sidecar_core::{
        LaunchSpec, OutputStream, ProcessHandle, ProcessId, ProcessInfo, ProcessLister,
        ProcessStatus, ServiceLauncher, SidecarError, TerminationResult,
    };
    use std::path::PathBuf;
    use std::process::Stdio;
    use sysinfo::System;
    use tokio::process::{Child, Command};
    use tracing::{info, warn};

    /// Windows-specific handle to the collector child process
    pub struct WindowsProcessHandle {
        child: Child,
    }

    impl WindowsProcessHandle {
        pub fn new(child: Child) -> Self {
            Self { child }
        }
    }

    #[async_trait]
    impl ProcessHandle for WindowsProcessHandle {
        fn pid(&self) -> Option<ProcessId> {
            self.child.id().map(ProcessId::from)
        }

        async fn is_running(&self) -> bool {
            if let Some(pid) = self.pid() {
                let mut system = System::new();
                system.refresh_processes_specifics(
                    sysinfo::ProcessesToUpdate::All,
                    true,
                    sysinfo::ProcessRefreshKind::default(),
                );
                system
                    .processes()
                    .keys()
                    .any(|candidate| candidate.as_u32() == pid.0)
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
            // Windows has no SIGTERM equivalent; taskkill without /F asks the
            // process to close via its window/console handlers
            if let Some(pid) = self.pid() {
                match Command::new("taskkill")
                    .args(["/PID", &pid.to_string()])
                    .output()
                    .await
                {
                    Ok(output) if output.status.success() => {
                        info!("Requested graceful stop of process {}", pid);
                        TerminationResult::Success
                    }
                    Ok(output) => {
                        let result = classify_taskkill_failure(
                            output.status.code(),
                            &String::from_utf8_lossy(&output.stderr),
                        );
                        if let TerminationResult::Failed(reason) = &result {
                            warn!("Graceful stop of process {} failed: {}", pid, reason);
                        }
                        result
                    }
                    Err(e) => {
                        warn!("Failed to run taskkill for process {}: {}", pid, e);
                        TerminationResult::Failed(format!("taskkill failed: {e}"))
                    }
                }
            } else {
                TerminationResult::ProcessNotFound
            }
        }

        async fn force_kill(&mut self) -> TerminationResult {
            let pid = self.pid();
            match self.child.kill().await {
                Ok(()) => {
                    if let Some(pid) = pid {
                        info!("Forcibly terminated process {}", pid);
                    }
                    TerminationResult::Success
                }
                Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => {
                    TerminationResult::ProcessNotFound
                }
                Err(e) => {
                    warn!("Failed to kill process {:?}: {}", pid, e);
                    TerminationResult::Failed(format!("kill failed: {e}"))
                }
            }
        }
    }

    /// taskkill exits with 128 when no process with the given PID exists;
    /// its stderr text is locale-dependent and not inspected
    fn classify_taskkill_failure(exit_code: Option<i32>, stderr: &str) -> TerminationResult {
        match exit_code {
            Some(128) => TerminationResult::ProcessNotFound,
            _ => TerminationResult::Failed(format!("taskkill failed: {}", stderr.trim())),
        }
    }

    /// Windows launcher for the collector child process
    #[derive(Default)]
    pub struct WindowsServiceLauncher;

    impl WindowsServiceLauncher {
        pub fn new() -> Self {
            Self
        }

        fn artifact_on_disk(spec: &LaunchSpec) -> PathBuf {
            match (&spec.working_directory, spec.artifact_path.is_relative()) {
                (Some(dir), true) => dir.join(&spec.artifact_path),
                _ => spec.artifact_path.clone(),
            }
        }
    }

    #[async_trait]
    impl ServiceLauncher for WindowsServiceLauncher {
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

            cmd.stdin(Stdio::null());
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());

            // CREATE_NO_WINDOW: run in the background without a console popup
            cmd.creation_flags(0x08000000);

            let child = cmd
                .spawn()
                .map_err(SidecarError::SpawnFailed)?;

            if let Some(pid) = child.id() {
                info!(pid = %pid, command = %spec.command_line(), "Spawned collector process");
            }

            Ok(Box::new(WindowsProcessHandle::new(child)))
        }
    }

    /// Process enumeration backed by sysinfo
    pub struct WindowsProcessLister {
        system: std::sync::Mutex<System>,
    }

    impl Default for WindowsProcessLister {
        fn default() -> Self {
            Self::new()
        }
    }

    impl WindowsProcessLister {
        pub fn new() -> Self {
            Self {
                system: std::sync::Mutex::new(System::new()),
            }
        }
    }

    #[async_trait]
    impl ProcessLister for WindowsProcessLister {
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

// Re-export the Windows implementation when on Windows systems
#[cfg(windows)]
pub use windows_impl::{WindowsProcessHandle, WindowsProcessLister, WindowsServiceLauncher};

// Provide stub implementations for non-Windows systems
#[cfg(not(windows))]
pub struct WindowsProcessHandle;

#[cfg(not(windows))]
#[derive(Default)]
pub struct WindowsServiceLauncher;

#[cfg(not(windows))]
impl WindowsServiceLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(windows))]
#[derive(Default)]
pub struct WindowsProcessLister;

#[cfg(not(windows))]
impl WindowsProcessLister {
    pub fn new() -> Self {
        Self
    }
}
