//! Startup orchestration for Kawaii Doodle.
//!
//! Two process-wide facilities, wired together by [`startup`]:
//! - [`crash::CrashGuard`] records every panic before the previous hook runs
//! - [`service::ServiceBootstrapper`] initializes the service client at most once

pub mod crash;
pub mod guard;
pub mod host;
pub mod runtime;
pub mod service;
pub mod startup;
pub mod tags;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use crash::{CrashConfig, CrashGuard, CrashReport, InstallOutcome};
pub use service::{BootstrapError, InitOutcome, ServiceBootstrapper, ServiceConfig};
pub use startup::{on_activity_create, on_application_create, StartupOptions, StartupReport};
