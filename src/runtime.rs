//! Process-wide startup state.
//!
//! One [`Runtime`] is created at process start and lives until exit. It owns
//! the crash guard and the service bootstrapper, so every entry point sees
//! the same install flag and the same client handle.
//!
//! ## Usage
//!
//! ```ignore
//! // At process start:
//! let rt = runtime::init(&CrashConfig::default());
//! rt.crash().install(&ProcessHooks);
//!
//! // Anywhere else:
//! if let Some(app) = runtime::get().and_then(|rt| rt.service().client()) {
//!     tracing::info!(project = app.project_id(), "service ready");
//! }
//! ```

use std::sync::OnceLock;

use chrono::{DateTime, Utc};

use crate::crash::{CrashConfig, CrashGuard};
use crate::service::{LocalConnector, ServiceBootstrapper};

/// Startup state shared by all entry points.
#[derive(Debug)]
pub struct Runtime {
    crash: CrashGuard,
    service: ServiceBootstrapper<LocalConnector>,
    created_at: DateTime<Utc>,
}

impl Runtime {
    /// Create a standalone runtime. Most code should use [`init`] instead.
    pub fn new(crash_config: &CrashConfig) -> Self {
        Self::with_parts(
            CrashGuard::from_config(crash_config),
            ServiceBootstrapper::new(LocalConnector::default()),
        )
    }

    pub fn with_parts(crash: CrashGuard, service: ServiceBootstrapper<LocalConnector>) -> Self {
        Self {
            crash,
            service,
            created_at: Utc::now(),
        }
    }

    pub fn crash(&self) -> &CrashGuard {
        &self.crash
    }

    pub fn service(&self) -> &ServiceBootstrapper<LocalConnector> {
        &self.service
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Global runtime singleton.
static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Create the global runtime, or return the existing one.
///
/// `crash_config` only takes effect on the first call.
pub fn init(crash_config: &CrashConfig) -> &'static Runtime {
    let mut created = false;
    let rt = RUNTIME.get_or_init(|| {
        created = true;
        Runtime::new(crash_config)
    });
    if !created {
        tracing::debug!("Runtime already initialized; keeping existing crash config");
    }
    rt
}

/// Get the global runtime.
///
/// Returns `None` if [`init`] hasn't been called yet.
pub fn get() -> Option<&'static Runtime> {
    RUNTIME.get()
}

/// Check if runtime has been initialized.
pub fn has_runtime() -> bool {
    RUNTIME.get().is_some()
}

/// Whether the global crash guard is installed.
pub fn crash_guard_installed() -> bool {
    RUNTIME.get().is_some_and(|rt| rt.crash.is_installed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_returns_same_instance() {
        let first = init(&CrashConfig::default());
        let second = init(&CrashConfig {
            include_backtrace: false,
            ..CrashConfig::default()
        });
        assert!(std::ptr::eq(first, second));
        assert!(has_runtime());
        assert!(get().is_some());
    }

    #[test]
    fn test_standalone_runtime_starts_empty() {
        let rt = Runtime::new(&CrashConfig::default());
        assert!(!rt.crash().is_installed());
        assert!(!rt.service().is_initialized());
        assert!(rt.created_at() <= Utc::now());
    }
}
