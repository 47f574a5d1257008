//! Log targets shared across the crate.
//!
//! These are used as `tracing` targets so crash output can be filtered with
//! e.g. `RUST_LOG=GLOBAL_CRASH=error`. Failures caught by [`crate::guard`]
//! are logged on the tag they were run under.

/// Uncaught panics captured by the crash guard
pub const GLOBAL: &str = "GLOBAL_CRASH";
/// Panics and errors inside supervised async tasks
pub const COROUTINE: &str = "COROUTINE_CRASH";
/// External service initialization
pub const SERVICE: &str = "SERVICE_ERROR";
/// Plugin registration with the host bridge
pub const PLUGIN: &str = "PLUGIN_ERROR";
/// Malformed JSON input
pub const JSON: &str = "JSON_ERROR";

/// `tracing::error!` on the target named by a runtime tag.
///
/// Targets must be constants, so known tags are matched to their constant.
/// Any other tag is logged on the caller's module target with a `tag` field.
macro_rules! tagged_error {
    ($tag:expr, $($arg:tt)+) => {
        match $tag {
            $crate::tags::GLOBAL => ::tracing::error!(target: $crate::tags::GLOBAL, $($arg)+),
            $crate::tags::COROUTINE => {
                ::tracing::error!(target: $crate::tags::COROUTINE, $($arg)+)
            }
            $crate::tags::SERVICE => ::tracing::error!(target: $crate::tags::SERVICE, $($arg)+),
            $crate::tags::PLUGIN => ::tracing::error!(target: $crate::tags::PLUGIN, $($arg)+),
            $crate::tags::JSON => ::tracing::error!(target: $crate::tags::JSON, $($arg)+),
            other => ::tracing::error!(tag = other, $($arg)+),
        }
    };
}

pub(crate) use tagged_error;
