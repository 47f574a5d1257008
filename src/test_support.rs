//! Helpers shared by unit tests that touch process environment variables.

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Serializes tests that read or write environment variables.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Clears the given variables and restores their previous values on drop.
pub(crate) struct EnvVarRestore {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvVarRestore {
    pub(crate) fn clear(names: &[&'static str]) -> Self {
        let saved = names
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();
        for name in names {
            std::env::remove_var(name);
        }
        Self { saved }
    }
}

impl Drop for EnvVarRestore {
    fn drop(&mut self) {
        for (name, value) in &self.saved {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}
