use collector_sidecar_core::{ProcessLister, ServiceLauncher};
use std::sync::Arc;
use tracing::info;

/// Platform-independent factory that selects the appropriate implementation
/// at compile time
pub struct PlatformSidecarFactory;

impl PlatformSidecarFactory {
    pub fn create_launcher() -> Arc<dyn ServiceLauncher> {
        #[cfg(unix)]
        {
            info!("Creating Unix collector launcher");
            Arc::new(collector_sidecar_unix::UnixSidecarFactory::create_launcher())
        }

        #[cfg(windows)]
        {
            info!("Creating Windows collector launcher");
            Arc::new(collector_sidecar_windows::WindowsSidecarFactory::create_launcher())
        }

        #[cfg(not(any(unix, windows)))]
        {
            compile_error!("Unsupported platform: only Unix and Windows are currently supported");
        }
    }

    pub fn create_lister() -> Arc<dyn ProcessLister> {
        #[cfg(unix)]
        {
            Arc::new(collector_sidecar_unix::UnixSidecarFactory::create_lister())
        }

        #[cfg(windows)]
        {
            Arc::new(collector_sidecar_windows::WindowsSidecarFactory::create_lister())
        }

        #[cfg(not(any(unix, windows)))]
        {
            compile_error!("Unsupported platform: only Unix and Windows are currently supported");
        }
    }

    pub fn platform_name() -> &'static str {
        #[cfg(unix)]
        {
            collector_sidecar_unix::UnixSidecarFactory::platform_name()
        }

        #[cfg(windows)]
        {
            collector_sidecar_windows::WindowsSidecarFactory::platform_name()
        }

        #[cfg(not(any(unix, windows)))]
        {
            "Unknown"
        }
    }
}
