use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide readiness state of the embedded collector.
///
/// The flag is owned by the lifecycle coordinator, which is the only writer.
/// Collaborators receive a [`ReadinessProbe`] and may query it from any
/// concurrent context at any time; before startup and after shutdown begins
/// it reads false.
#[derive(Debug, Default)]
pub struct ReadinessFlag {
    inner: Arc<AtomicBool>,
}

impl ReadinessFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a read-only view of the flag
    pub fn probe(&self) -> ReadinessProbe {
        ReadinessProbe {
            inner: self.inner.clone(),
        }
    }

    pub fn mark_ready(&self) {
        self.inner.store(true, Ordering::Release);
    }

    pub fn mark_not_ready(&self) {
        self.inner.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}

/// Read-only capability over the readiness flag. Cheap to clone and safe to
/// share with arbitrarily many readers.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    inner: Arc<AtomicBool>,
}

impl ReadinessProbe {
    pub fn is_ready(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}
