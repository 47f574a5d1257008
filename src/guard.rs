//! Failure-isolating wrappers for risky calls.
//!
//! `safe_run` and `safe_async` turn both errors and panics into `None` plus a
//! log line, for one-off work (image decoding, JSON parsing, network calls)
//! whose failure should not take the caller down. `spawn_supervised` does the
//! same for background tasks, so one failing task never affects its siblings.
//!
//! Failures are logged with `tag` as the tracing target (see [`crate::tags`]),
//! so `RUST_LOG=COROUTINE_CRASH=error` selects supervised-task crashes.
//!
//! A panic caught here still passes through the process panic hook first, so
//! an installed crash guard records it as well.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures_util::FutureExt;
use tokio::task::JoinHandle;

use crate::crash::describe_payload;
use crate::tags::{self, tagged_error};

/// Run `block`, returning `None` if it fails or panics.
pub fn safe_run<T>(
    tag: &'static str,
    operation: &str,
    block: impl FnOnce() -> anyhow::Result<T>,
) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(block)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tagged_error!(tag, operation, "❌ safe_run failed: {:#}", e);
            None
        }
        Err(payload) => {
            let (_, message) = describe_payload(payload.as_ref());
            tagged_error!(tag, operation, "❌ safe_run panicked: {}", message);
            None
        }
    }
}

/// Async counterpart of [`safe_run`].
pub async fn safe_async<T, F>(tag: &'static str, operation: &str, future: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tagged_error!(tag, operation, "❌ safe_async failed: {:#}", e);
            None
        }
        Err(payload) => {
            let (_, message) = describe_payload(payload.as_ref());
            tagged_error!(tag, operation, "❌ safe_async panicked: {}", message);
            None
        }
    }
}

/// Spawn a background task whose failure is logged on `COROUTINE_CRASH`
/// instead of propagating.
///
/// Must be called from within a tokio runtime.
pub fn spawn_supervised<T, F>(name: impl Into<String>, future: F) -> JoinHandle<Option<T>>
where
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let name = name.into();
    tokio::spawn(async move { safe_async(tags::COROUTINE, &name, future).await })
}
