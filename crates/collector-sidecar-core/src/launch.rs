use crate::SidecarConfig;
use std::collections::HashMap;
use std::path::PathBuf;

/// Immutable description of how the collector child process is started.
///
/// Constructed once from the configuration before launch; never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub artifact_path: PathBuf,
    pub port: u16,
    pub env: HashMap<String, String>,
}

impl LaunchSpec {
    /// Build the launch description for the configured collector.
    ///
    /// The argument shape mirrors a runnable-jar service invocation:
    /// `<runtime> -jar <artifact> --server.port=<port>
    /// --logging.level.<service>=INFO`.
    pub fn from_config(config: &SidecarConfig) -> Self {
        let args = vec![
            "-jar".to_string(),
            config.artifact_path.display().to_string(),
            format!("--server.port={}", config.port),
            format!("--logging.level.{}=INFO", config.service_name),
        ];

        Self {
            program: config.runtime.clone(),
            args,
            working_directory: config.working_directory.clone(),
            artifact_path: config.artifact_path.clone(),
            port: config.port,
            env: config.env.clone(),
        }
    }

    /// Rendered command line, for logging only
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}
