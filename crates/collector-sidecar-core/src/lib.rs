//! Collector Sidecar Core - Platform-independent abstractions and configurations
//!
//! This crate provides the configuration, error taxonomy, launch description,
//! readiness flag, and process traits that are shared across the
//! platform-specific implementations.

mod config;
mod error;
mod launch;
mod process;
mod readiness;

pub use config::*;
pub use error::*;
pub use launch::*;
pub use process::*;
pub use readiness::*;
