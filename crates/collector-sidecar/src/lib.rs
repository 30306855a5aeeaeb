//! Embedded collector lifecycle management.
//!
//! This crate launches an external observability collector (a runnable jar
//! listening on a TCP port) as a child process when the host application
//! starts, waits for it to become healthy, mirrors interesting child log
//! lines into the host's logs, exposes a process-wide readiness flag, and
//! tears the child down cleanly at host shutdown.
//!
//! The entry point is [`LifecycleCoordinator`]: construct it from a
//! [`SidecarConfig`], call [`LifecycleCoordinator::start`] on the host's
//! startup path and [`LifecycleCoordinator::shutdown`] on its shutdown path.
//! Collaborators that want to know whether the collector is accepting
//! connections hold a [`ReadinessProbe`].
//!
//! A failed startup never aborts the host application: the coordinator ends
//! up in [`LifecycleState::Failed`] with the fault recorded, and the
//! readiness probe simply keeps reading false.

mod cleaner;
mod coordinator;
mod health;
mod platform;
mod probe;
mod pump;

pub use cleaner::StaleProcessCleaner;
pub use coordinator::{LifecycleCoordinator, LifecycleState};
pub use platform::PlatformSidecarFactory;
pub use probe::is_port_available;
pub use pump::{OutputPump, StreamKind};

// Re-export core functionality
pub use collector_sidecar_core::*;
