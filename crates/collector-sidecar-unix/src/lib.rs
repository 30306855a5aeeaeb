mod unix_sidecar;

pub use unix_sidecar::{UnixProcessHandle, UnixProcessLister, UnixServiceLauncher};

pub struct UnixSidecarFactory;

impl UnixSidecarFactory {
    pub fn create_launcher() -> UnixServiceLauncher {
        UnixServiceLauncher::new()
    }

    pub fn create_lister() -> UnixProcessLister {
        UnixProcessLister::new()
    }

    pub fn platform_name() -> &'static str {
        "Unix"
    }
}
