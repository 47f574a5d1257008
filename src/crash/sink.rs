//! Destinations for crash reports.
//!
//! Sinks report failure through [`CaptureError`] and must never panic: a
//! panic raised while the panic hook is running aborts the process.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use super::report::CrashReport;
use crate::tags;

/// A crash report could not be persisted.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to serialize crash report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write crash report to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("report sink unavailable: {0}")]
    Unavailable(String),
}

/// Where captured reports go.
pub trait ReportSink: Send + Sync {
    fn write(&self, report: &CrashReport) -> Result<(), CaptureError>;
}

/// Emits reports as structured `tracing` events on the `GLOBAL_CRASH` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn write(&self, report: &CrashReport) -> Result<(), CaptureError> {
        tracing::error!(
            target: tags::GLOBAL,
            report_id = %report.report_id,
            thread_id = %report.thread_id,
            thread_name = report.thread_name.as_deref().unwrap_or("<unnamed>"),
            failure_type = %report.failure_type,
            location = report.location.as_deref().unwrap_or("unknown"),
            timestamp = %report.timestamp_utc.to_rfc3339(),
            "💥 UNCAUGHT PANIC: {}",
            report.message
        );
        if !report.stack_trace.is_empty() {
            tracing::error!(target: tags::GLOBAL, "Stack trace:\n{}", report.stack_trace);
        }
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CaptureError {
        CaptureError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl ReportSink for JsonLinesSink {
    fn write(&self, report: &CrashReport) -> Result<(), CaptureError> {
        let mut line = serde_json::to_string(report)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.sync_data().map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<CrashReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all reports written so far
    pub fn reports(&self) -> Vec<CrashReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReportSink for MemorySink {
    fn write(&self, report: &CrashReport) -> Result<(), CaptureError> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }
}

/// Writes to every inner sink, even after one fails.
///
/// Returns the first error encountered.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ReportSink for FanoutSink {
    fn write(&self, report: &CrashReport) -> Result<(), CaptureError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(err) = sink.write(report) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
