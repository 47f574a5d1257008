//! Narrow interfaces to the host UI bridge.
//!
//! The bridge itself is external. The crate only needs to register named
//! capability handlers before the bridge starts dispatching, and to flip the
//! web-content debugging switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::tags;

/// Name under which the wallpaper capability is exposed to the web layer.
pub const WALLPAPER_PLUGIN: &str = "Wallpaper";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("plugin `{0}` registered after the bridge started dispatching")]
    DispatchStarted(String),
    #[error("plugin `{0}` is already registered")]
    DuplicatePlugin(String),
}

/// Plugin registration side of the bridge.
pub trait PluginHost: Send + Sync {
    /// Register a named capability handler.
    fn register_plugin(&self, name: &str) -> Result<(), HostError>;
    /// Mark the point after which no more plugins may be registered.
    fn begin_dispatch(&self);
}

#[derive(Debug, Default)]
struct RegistryState {
    plugins: Vec<String>,
    dispatching: bool,
}

/// In-process [`PluginHost`] that enforces registration order.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    state: Mutex<RegistryState>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugins(&self) -> Vec<String> {
        self.lock().plugins.clone()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock().plugins.iter().any(|p| p == name)
    }

    pub fn is_dispatching(&self) -> bool {
        self.lock().dispatching
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PluginHost for PluginRegistry {
    fn register_plugin(&self, name: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        if state.dispatching {
            warn!(target: tags::PLUGIN, plugin = name, "Plugin registered too late");
            return Err(HostError::DispatchStarted(name.to_string()));
        }
        if state.plugins.iter().any(|p| p == name) {
            return Err(HostError::DuplicatePlugin(name.to_string()));
        }
        state.plugins.push(name.to_string());
        debug!(target: tags::PLUGIN, plugin = name, "Plugin registered");
        Ok(())
    }

    fn begin_dispatch(&self) {
        self.lock().dispatching = true;
    }
}

/// Process-wide debug instrumentation switch of the web-rendering component.
pub trait Instrumentation: Send + Sync {
    fn set_web_debugging(&self, enabled: bool);
    fn web_debugging(&self) -> bool;
}

static WEB_CONTENTS_DEBUGGING: AtomicBool = AtomicBool::new(false);

/// The real, process-global switch.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebDebugging;

impl Instrumentation for WebDebugging {
    fn set_web_debugging(&self, enabled: bool) {
        WEB_CONTENTS_DEBUGGING.store(enabled, Ordering::SeqCst);
        debug!(enabled, "Web contents debugging toggled");
    }

    fn web_debugging(&self) -> bool {
        WEB_CONTENTS_DEBUGGING.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_before_dispatch() {
        let registry = PluginRegistry::new();
        registry.register_plugin(WALLPAPER_PLUGIN).unwrap();

        assert!(registry.is_registered(WALLPAPER_PLUGIN));
        assert_eq!(registry.plugins(), vec![WALLPAPER_PLUGIN.to_string()]);
    }

    #[test]
    fn test_register_after_dispatch_is_rejected() {
        let registry = PluginRegistry::new();
        registry.begin_dispatch();

        let err = registry.register_plugin(WALLPAPER_PLUGIN).unwrap_err();
        assert_eq!(err, HostError::DispatchStarted(WALLPAPER_PLUGIN.to_string()));
        assert!(registry.is_dispatching());
        assert!(registry.plugins().is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = PluginRegistry::new();
        registry.register_plugin("Share").unwrap();

        let err = registry.register_plugin("Share").unwrap_err();
        assert_eq!(err.to_string(), "plugin `Share` is already registered");
    }

    #[test]
    fn test_web_debugging_switch() {
        WebDebugging.set_web_debugging(true);
        assert!(WebDebugging.web_debugging());
    }
}
