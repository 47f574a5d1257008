//! Crash report records.
//!
//! A [`CrashReport`] is built once, at the moment a panic reaches the hook,
//! and is never mutated after it has been handed to a sink.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::PanicHookInfo;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum stack trace length kept in a report (64 KiB).
pub const MAX_STACK_TRACE_LEN: usize = 64 * 1024;

/// Failure type recorded when the panic payload is neither `&str` nor `String`.
const UNKNOWN_PAYLOAD: &str = "unknown";

/// One uncaught failure, as written to a report sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashReport {
    /// Unique id so appended records can be told apart
    pub report_id: Uuid,
    /// Debug form of the failing thread's id, e.g. `ThreadId(7)`
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_name: Option<String>,
    pub process_id: u32,
    pub timestamp_utc: DateTime<Utc>,
    /// Kind of panic payload (`&str`, `String`, or `unknown`)
    pub failure_type: String,
    pub message: String,
    /// `file:line:col` of the panic site, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Captured backtrace; empty when backtraces are disabled
    #[serde(default)]
    pub stack_trace: String,
}

impl CrashReport {
    /// Create a report for a failure on the current thread, timestamped now.
    pub fn new(failure_type: impl Into<String>, message: impl Into<String>) -> Self {
        let thread = std::thread::current();
        Self {
            report_id: Uuid::new_v4(),
            thread_id: format!("{:?}", thread.id()),
            thread_name: thread.name().map(String::from),
            process_id: std::process::id(),
            timestamp_utc: Utc::now(),
            failure_type: failure_type.into(),
            message: message.into(),
            location: None,
            stack_trace: String::new(),
        }
    }

    /// Build a report from the information handed to a panic hook.
    pub fn from_panic(info: &PanicHookInfo<'_>, include_backtrace: bool) -> Self {
        // Capture first so the trace is as close to the panic site as possible
        let stack_trace = if include_backtrace {
            Backtrace::force_capture().to_string()
        } else {
            String::new()
        };

        let (failure_type, message) = describe_payload(info.payload());
        let location = info
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));

        Self::new(failure_type, message)
            .with_location(location)
            .with_stack_trace(stack_trace)
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    /// Attach a stack trace, truncated to [`MAX_STACK_TRACE_LEN`].
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = truncate_stack_trace(stack_trace.into());
        self
    }

    /// Single-line summary used in log messages.
    pub fn summary(&self) -> String {
        let thread = self.thread_name.as_deref().unwrap_or("<unnamed>");
        match &self.location {
            Some(loc) => format!(
                "panic on thread {} ({}) at {}: {}",
                thread, self.thread_id, loc, self.message
            ),
            None => format!(
                "panic on thread {} ({}): {}",
                thread, self.thread_id, self.message
            ),
        }
    }
}

/// Classify a panic payload and extract its message.
pub(crate) fn describe_payload(payload: &(dyn Any + Send)) -> (&'static str, String) {
    if let Some(s) = payload.downcast_ref::<&str>() {
        ("&str", (*s).to_string())
    } else if let Some(s) = payload.downcast_ref::<String>() {
        ("String", s.clone())
    } else {
        (UNKNOWN_PAYLOAD, "unknown panic payload".to_string())
    }
}

fn truncate_stack_trace(mut trace: String) -> String {
    if trace.len() <= MAX_STACK_TRACE_LEN {
        return trace;
    }
    let mut cut = MAX_STACK_TRACE_LEN;
    while !trace.is_char_boundary(cut) {
        cut -= 1;
    }
    trace.truncate(cut);
    trace.push_str("\n... [truncated]");
    trace
}
