//! Telemetry opt-out.
//!
//! When telemetry is disabled the startup sequence skips the external
//! service entirely and the app runs in the same degraded mode it would use
//! after a failed initialization.

/// Environment variable to disable the telemetry backend
pub const DISABLE_TELEMETRY_ENV: &str = "KAWAII_DISABLE_TELEMETRY";

/// Check if telemetry is enabled
pub fn is_telemetry_enabled() -> bool {
    match std::env::var(DISABLE_TELEMETRY_ENV) {
        Ok(val) => {
            let val_lower = val.trim().to_lowercase();
            // Disabled if set to "1", "true", "yes", "on"
            !matches!(val_lower.as_str(), "1" | "true" | "yes" | "on")
        }
        // Enabled by default if env var is not set
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{env_lock, EnvVarRestore};

    #[test]
    fn test_is_telemetry_enabled_default() {
        let _env_lock_guard = env_lock();
        let _env_restore = EnvVarRestore::clear(&[DISABLE_TELEMETRY_ENV]);
        assert!(is_telemetry_enabled());
    }

    #[test]
    fn test_is_telemetry_disabled() {
        let _env_lock_guard = env_lock();
        let _env_restore = EnvVarRestore::clear(&[DISABLE_TELEMETRY_ENV]);

        for value in ["1", "true", "TRUE", "yes", "on", " on "] {
            std::env::set_var(DISABLE_TELEMETRY_ENV, value);
            assert!(!is_telemetry_enabled(), "{:?} should disable", value);
        }
    }

    #[test]
    fn test_is_telemetry_enabled_with_other_values() {
        let _env_lock_guard = env_lock();
        let _env_restore = EnvVarRestore::clear(&[DISABLE_TELEMETRY_ENV]);

        for value in ["0", "false", "no", ""] {
            std::env::set_var(DISABLE_TELEMETRY_ENV, value);
            assert!(is_telemetry_enabled(), "{:?} should keep telemetry on", value);
        }
    }
}
