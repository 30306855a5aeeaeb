use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the embedded collector lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Builder)]
#[serde(rename_all = "camelCase")]
#[builder(setter(into))]
pub struct SidecarConfig {
    /// Whether the embedded collector is managed at all.
    /// When false the whole lifecycle is a silent no-op.
    #[serde(default = "default_enabled")]
    #[builder(default = "default_enabled()")]
    pub enabled: bool,

    /// Host used for the port probe and readiness checks
    #[serde(default = "default_host")]
    #[builder(default = "default_host()")]
    pub host: String,

    /// TCP port the collector listens on
    #[serde(default = "default_port")]
    #[builder(default = "default_port()")]
    pub port: u16,

    /// Upper bound for the startup health wait (seconds)
    #[serde(default = "default_startup_timeout_secs")]
    #[builder(default = "default_startup_timeout_secs()")]
    pub startup_timeout_secs: u64,

    /// Grace period for a polite termination request (seconds)
    #[serde(default = "default_graceful_shutdown_timeout_secs")]
    #[builder(default = "default_graceful_shutdown_timeout_secs()")]
    pub graceful_shutdown_timeout_secs: u64,

    /// Grace period after forced termination (seconds)
    #[serde(default = "default_forced_shutdown_timeout_secs")]
    #[builder(default = "default_forced_shutdown_timeout_secs()")]
    pub forced_shutdown_timeout_secs: u64,

    /// Program used to run the collector artifact (e.g. `java`)
    #[serde(default = "default_runtime")]
    #[builder(default = "default_runtime()")]
    pub runtime: String,

    /// Path to the runnable collector artifact, resolved against the
    /// working directory when relative
    #[serde(default = "default_artifact_path")]
    #[builder(default = "default_artifact_path()")]
    pub artifact_path: PathBuf,

    /// Working directory for the child process (inherited when None)
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub working_directory: Option<PathBuf>,

    /// Short name of the managed service; used for the child logging flag,
    /// the stale-process scan and as the log mirror label
    #[serde(default = "default_service_name")]
    #[builder(default = "default_service_name()")]
    pub service_name: String,

    /// Extra environment variables for the child process
    #[serde(default)]
    #[builder(default)]
    #[builder(setter(custom))]
    pub env: HashMap<String, String>,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            host: default_host(),
            port: default_port(),
            startup_timeout_secs: default_startup_timeout_secs(),
            graceful_shutdown_timeout_secs: default_graceful_shutdown_timeout_secs(),
            forced_shutdown_timeout_secs: default_forced_shutdown_timeout_secs(),
            runtime: default_runtime(),
            artifact_path: default_artifact_path(),
            working_directory: None,
            service_name: default_service_name(),
            env: HashMap::new(),
        }
    }
}

impl SidecarConfig {
    pub fn builder() -> SidecarConfigBuilder {
        SidecarConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            return Err(anyhow::anyhow!("port must be non-zero"));
        }

        if self.startup_timeout_secs == 0 {
            return Err(anyhow::anyhow!("startup_timeout_secs must be non-zero"));
        }

        if self.graceful_shutdown_timeout_secs == 0 || self.forced_shutdown_timeout_secs == 0 {
            return Err(anyhow::anyhow!("shutdown timeouts must be non-zero"));
        }

        if self.runtime.is_empty() {
            return Err(anyhow::anyhow!("runtime must not be empty"));
        }

        if self.artifact_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("artifact_path must not be empty"));
        }

        if self.service_name.is_empty() {
            return Err(anyhow::anyhow!("service_name must not be empty"));
        }

        Ok(())
    }

    /// Get the startup wait bound as Duration
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Get the graceful termination grace period as Duration
    pub fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_shutdown_timeout_secs)
    }

    /// Get the forced termination grace period as Duration
    pub fn forced_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.forced_shutdown_timeout_secs)
    }
}

impl SidecarConfigBuilder {
    pub fn env<T: ToString>(&mut self, key: T, value: T) -> &mut Self {
        let map = self.env.get_or_insert_with(HashMap::new);
        map.insert(key.to_string(), value.to_string());

        self
    }

    pub fn env_multi<T: ToString, I: IntoIterator<Item = (T, T)>>(&mut self, iter: I) -> &mut Self {
        let env = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in iter {
            env.insert(key.to_string(), value.to_string());
        }
        self
    }
}

// Default value functions for serde
fn default_enabled() -> bool {
    true
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    9411
}
fn default_startup_timeout_secs() -> u64 {
    30
}
fn default_graceful_shutdown_timeout_secs() -> u64 {
    10
}
fn default_forced_shutdown_timeout_secs() -> u64 {
    5
}
fn default_runtime() -> String {
    "java".to_string()
}
fn default_artifact_path() -> PathBuf {
    PathBuf::from("lib").join("zipkin.jar")
}
fn default_service_name() -> String {
    "zipkin".to_string()
}
