mod windows_sidecar;

pub use windows_sidecar::{WindowsProcessHandle, WindowsProcessLister, WindowsServiceLauncher};

pub struct WindowsSidecarFactory;

impl WindowsSidecarFactory {
    pub fn create_launcher() -> WindowsServiceLauncher {
        WindowsServiceLauncher::new()
    }

    pub fn create_lister() -> WindowsProcessLister {
        WindowsProcessLister::new()
    }

    pub fn platform_name() -> &'static str {
        "Windows"
    }
}
