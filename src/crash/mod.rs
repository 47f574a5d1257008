//! Process-wide crash capture.
//!
//! The [`CrashGuard`] replaces the `std::panic` hook with an interceptor that:
//! 1. builds a [`CrashReport`] for the panicking thread,
//! 2. hands it to a [`ReportSink`], swallowing any sink error,
//! 3. delegates to the hook that was installed before it.
//!
//! Installing is idempotent. Installers are serialized and the installed flag
//! is only set once the hook is really in place, so when several threads race
//! to install only one of them takes the previous hook and chains it, and the
//! others never report a guard that is not there.

mod report;
mod sink;

pub use report::{CrashReport, MAX_STACK_TRACE_LEN};
pub use sink::{CaptureError, FanoutSink, JsonLinesSink, MemorySink, ReportSink, TracingSink};

use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info, warn};

use crate::tags;
pub(crate) use report::describe_payload;

/// Boxed panic hook, as accepted by [`std::panic::set_hook`].
pub type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Access to the slot holding the process panic hook.
pub trait HookRegistry: Send + Sync {
    /// Remove and return the current hook.
    fn take(&self) -> PanicHook;
    /// Install `hook` as the current hook.
    fn set(&self, hook: PanicHook);
}

/// The real `std::panic` hook slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessHooks;

impl HookRegistry for ProcessHooks {
    fn take(&self) -> PanicHook {
        panic::take_hook()
    }

    fn set(&self, hook: PanicHook) {
        panic::set_hook(hook);
    }
}

/// Crash capture settings.
#[derive(Debug, Clone)]
pub struct CrashConfig {
    /// Append reports as JSON lines to this file, in addition to the log
    pub report_file: Option<PathBuf>,
    /// Capture a full backtrace for every report
    pub include_backtrace: bool,
    /// Abort the process after the previous hook has run
    pub abort_after_report: bool,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            report_file: None,
            include_backtrace: true,
            abort_after_report: false,
        }
    }
}

impl CrashConfig {
    /// Build the sink described by this config: the log, plus the report
    /// file when one is configured.
    pub fn build_sink(&self) -> Arc<dyn ReportSink> {
        match &self.report_file {
            Some(path) => Arc::new(
                FanoutSink::new()
                    .with(Arc::new(TracingSink))
                    .with(Arc::new(JsonLinesSink::new(path))),
            ),
            None => Arc::new(TracingSink),
        }
    }
}

/// Result of [`CrashGuard::install`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// This call installed the hook
    Installed,
    /// The hook was already installed; nothing changed
    AlreadyInstalled,
    /// The hook could not be installed; the guard stays uninstalled
    Failed(String),
}

impl InstallOutcome {
    /// Whether the guard is in place after this call.
    pub fn is_active(&self) -> bool {
        matches!(self, InstallOutcome::Installed | InstallOutcome::AlreadyInstalled)
    }
}

/// Report-then-delegate logic run for each panic.
struct Interceptor {
    sink: Arc<dyn ReportSink>,
    include_backtrace: bool,
    abort_after_report: bool,
    captured: AtomicU64,
    capture_failures: AtomicU64,
}

impl Interceptor {
    fn on_panic(&self, info: &PanicHookInfo<'_>, previous: &PanicHook) {
        let report = CrashReport::from_panic(info, self.include_backtrace);
        self.intercept(&report, || previous(info));
        if self.abort_after_report {
            std::process::abort();
        }
    }

    /// Capture `report`, then run `delegate` whether or not capture worked.
    fn intercept(&self, report: &CrashReport, delegate: impl FnOnce()) {
        self.capture(report);
        delegate();
    }

    fn capture(&self, report: &CrashReport) {
        match self.sink.write(report) {
            Ok(()) => {
                self.captured.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                self.capture_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    target: tags::GLOBAL,
                    report_id = %report.report_id,
                    error = %err,
                    "failed to capture crash report"
                );
            }
        }
    }
}

/// Global panic interceptor with a write-once installed flag.
pub struct CrashGuard {
    /// Set only after the hook has actually been swapped in
    installed: AtomicBool,
    /// Serializes installers; held for the whole take-and-set
    install_lock: Mutex<()>,
    interceptor: Arc<Interceptor>,
}

impl CrashGuard {
    /// Create an uninstalled guard writing to `sink`.
    pub fn new(sink: Arc<dyn ReportSink>) -> Self {
        Self::with_settings(sink, true, false)
    }

    pub fn from_config(config: &CrashConfig) -> Self {
        Self::with_settings(
            config.build_sink(),
            config.include_backtrace,
            config.abort_after_report,
        )
    }

    fn with_settings(
        sink: Arc<dyn ReportSink>,
        include_backtrace: bool,
        abort_after_report: bool,
    ) -> Self {
        Self {
            installed: AtomicBool::new(false),
            install_lock: Mutex::new(()),
            interceptor: Arc::new(Interceptor {
                sink,
                include_backtrace,
                abort_after_report,
                captured: AtomicU64::new(0),
                capture_failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Number of reports successfully written.
    pub fn captured_reports(&self) -> u64 {
        self.interceptor.captured.load(Ordering::Relaxed)
    }

    /// Number of reports the sink failed to write.
    pub fn capture_failures(&self) -> u64 {
        self.interceptor.capture_failures.load(Ordering::Relaxed)
    }

    /// Install the interceptor into `registry`.
    ///
    /// Never panics and never returns an error to the caller: a second call
    /// is a no-op and an installation failure is logged and reported as
    /// [`InstallOutcome::Failed`].
    ///
    /// A caller racing an install in progress waits for it. It returns
    /// `AlreadyInstalled` only if the hook really is in place, and otherwise
    /// makes its own attempt.
    pub fn install(&self, registry: &dyn HookRegistry) -> InstallOutcome {
        if self.is_installed() {
            debug!(target: tags::GLOBAL, "panic hook already installed; ignoring");
            return InstallOutcome::AlreadyInstalled;
        }

        // std refuses to touch the hook from a panicking thread
        if std::thread::panicking() {
            let reason = "cannot install panic hook from a panicking thread".to_string();
            error!(target: tags::GLOBAL, "❌ {}", reason);
            return InstallOutcome::Failed(reason);
        }

        // Nothing is published under this lock until the swap succeeded
        let _guard = self
            .install_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.is_installed() {
            debug!(target: tags::GLOBAL, "panic hook installed by a concurrent caller");
            return InstallOutcome::AlreadyInstalled;
        }

        let interceptor = Arc::clone(&self.interceptor);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let previous = registry.take();
            registry.set(Box::new(move |info: &PanicHookInfo<'_>| {
                interceptor.on_panic(info, &previous)
            }));
        }));

        match result {
            Ok(()) => {
                self.installed.store(true, Ordering::Release);
                info!(target: tags::GLOBAL, "✅ Global panic hook installed");
                InstallOutcome::Installed
            }
            Err(payload) => {
                let (_, reason) = describe_payload(payload.as_ref());
                error!(target: tags::GLOBAL, error = %reason, "❌ Failed to install panic hook");
                InstallOutcome::Failed(reason)
            }
        }
    }

    /// Run the capture-then-delegate sequence for an already built report.
    ///
    /// The installed hook does the same for every panic; this entry point
    /// also lets embedders route failures they caught themselves.
    pub fn intercept(&self, report: &CrashReport, delegate: impl FnOnce()) {
        self.interceptor.intercept(report, delegate);
    }
}

impl std::fmt::Debug for CrashGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashGuard")
            .field("installed", &self.is_installed())
            .field("captured_reports", &self.captured_reports())
            .field("capture_failures", &self.capture_failures())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Barrier, Mutex};
    use std::time::Duration;

    fn noop_hook() -> PanicHook {
        Box::new(|_info: &PanicHookInfo<'_>| {})
    }

    /// Hook slot that records how often it is touched.
    #[derive(Default)]
    struct FakeRegistry {
        takes: AtomicUsize,
        sets: AtomicUsize,
        current: Mutex<Option<PanicHook>>,
    }

    impl HookRegistry for FakeRegistry {
        fn take(&self) -> PanicHook {
            self.takes.fetch_add(1, Ordering::SeqCst);
            self.current.lock().unwrap().take().unwrap_or_else(noop_hook)
        }

        fn set(&self, hook: PanicHook) {
            self.sets.fetch_add(1, Ordering::SeqCst);
            *self.current.lock().unwrap() = Some(hook);
        }
    }

    struct ExplodingRegistry;

    impl HookRegistry for ExplodingRegistry {
        fn take(&self) -> PanicHook {
            panic!("hook slot unavailable");
        }

        fn set(&self, _hook: PanicHook) {}
    }

    /// Takes a while to reach the hook slot, then either fails or succeeds.
    struct SlowRegistry {
        fail: bool,
        takes: AtomicUsize,
        inner: FakeRegistry,
    }

    impl SlowRegistry {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                takes: AtomicUsize::new(0),
                inner: FakeRegistry::default(),
            }
        }
    }

    impl HookRegistry for SlowRegistry {
        fn take(&self) -> PanicHook {
            self.takes.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            if self.fail {
                panic!("hook slot unavailable");
            }
            self.inner.take()
        }

        fn set(&self, hook: PanicHook) {
            self.inner.set(hook);
        }
    }

    /// Install on two threads, the second starting while the first is mid-swap.
    fn racing_installs(
        registry: &SlowRegistry,
    ) -> (CrashGuard, InstallOutcome, InstallOutcome, bool) {
        let guard = CrashGuard::new(Arc::new(MemorySink::new()));
        let (first, second, installed_when_second_returned) = std::thread::scope(|scope| {
            let first = scope.spawn(|| guard.install(registry));
            std::thread::sleep(Duration::from_millis(50));
            let second = scope.spawn(|| {
                let outcome = guard.install(registry);
                (outcome, guard.is_installed())
            });
            let (second, installed) = second.join().unwrap();
            (first.join().unwrap(), second, installed)
        });
        (guard, first, second, installed_when_second_returned)
    }

    struct BrokenSink;

    impl ReportSink for BrokenSink {
        fn write(&self, _report: &CrashReport) -> Result<(), CaptureError> {
            Err(CaptureError::Unavailable("sink offline".to_string()))
        }
    }

    #[test]
    fn test_second_install_is_noop() {
        let registry = FakeRegistry::default();
        let guard = CrashGuard::new(Arc::new(MemorySink::new()));

        assert_eq!(guard.install(&registry), InstallOutcome::Installed);
        assert_eq!(guard.install(&registry), InstallOutcome::AlreadyInstalled);

        assert!(guard.is_installed());
        assert_eq!(registry.takes.load(Ordering::SeqCst), 1);
        assert_eq!(registry.sets.load(Ordering::SeqCst), 1);
        assert_eq!(guard.captured_reports(), 0);
    }

    #[test]
    fn test_concurrent_installs_chain_exactly_once() {
        const THREADS: usize = 16;
        let registry = Arc::new(FakeRegistry::default());
        let guard = Arc::new(CrashGuard::new(Arc::new(MemorySink::new())));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = registry.clone();
                let guard = guard.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    guard.install(registry.as_ref())
                })
            })
            .collect();

        let outcomes: Vec<InstallOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        let installed = outcomes
            .iter()
            .filter(|o| **o == InstallOutcome::Installed)
            .count();
        assert_eq!(installed, 1);
        assert!(outcomes.iter().all(InstallOutcome::is_active));
        assert_eq!(registry.takes.load(Ordering::SeqCst), 1);
        assert_eq!(registry.sets.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_install_is_reported_and_retryable() {
        let guard = CrashGuard::new(Arc::new(MemorySink::new()));

        let outcome = guard.install(&ExplodingRegistry);
        assert_eq!(
            outcome,
            InstallOutcome::Failed("hook slot unavailable".to_string())
        );
        assert!(!guard.is_installed());

        let registry = FakeRegistry::default();
        assert_eq!(guard.install(&registry), InstallOutcome::Installed);
    }

    #[test]
    fn test_racing_install_waits_for_failed_winner() {
        let registry = SlowRegistry::new(true);
        let (guard, first, second, installed) = racing_installs(&registry);

        assert_eq!(
            first,
            InstallOutcome::Failed("hook slot unavailable".to_string())
        );
        // The late caller must not claim a guard that never went in
        assert!(!second.is_active(), "second caller got {:?}", second);
        assert!(!installed);
        assert!(!guard.is_installed());
        assert_eq!(registry.takes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_racing_install_sees_successful_winner() {
        let registry = SlowRegistry::new(false);
        let (guard, first, second, installed) = racing_installs(&registry);

        assert_eq!(first, InstallOutcome::Installed);
        assert_eq!(second, InstallOutcome::AlreadyInstalled);
        assert!(installed);
        assert!(guard.is_installed());
        assert_eq!(registry.takes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_intercept_writes_report_then_delegates() {
        let sink = Arc::new(MemorySink::new());
        let guard = CrashGuard::new(sink.clone());
        let delegated = AtomicBool::new(false);

        let report = CrashReport::new("&str", "boom");
        guard.intercept(&report, || {
            // The report must already be captured when the previous hook runs
            assert_eq!(sink.len(), 1);
            delegated.store(true, Ordering::SeqCst);
        });

        assert!(delegated.load(Ordering::SeqCst));
        assert_eq!(guard.captured_reports(), 1);
        assert_eq!(sink.reports()[0].report_id, report.report_id);
    }

    #[test]
    fn test_sink_failure_does_not_block_delegation() {
        let guard = CrashGuard::new(Arc::new(BrokenSink));
        let delegated = AtomicBool::new(false);

        guard.intercept(&CrashReport::new("String", "boom"), || {
            delegated.store(true, Ordering::SeqCst);
        });

        assert!(delegated.load(Ordering::SeqCst));
        assert_eq!(guard.captured_reports(), 0);
        assert_eq!(guard.capture_failures(), 1);
    }

    #[test]
    fn test_from_config_applies_settings() {
        let config = CrashConfig {
            report_file: None,
            include_backtrace: false,
            abort_after_report: false,
        };
        let guard = CrashGuard::from_config(&config);
        assert!(!guard.interceptor.include_backtrace);
        assert!(!guard.is_installed());
    }

    #[test]
    fn test_install_outcome_is_active() {
        assert!(InstallOutcome::Installed.is_active());
        assert!(InstallOutcome::AlreadyInstalled.is_active());
        assert!(!InstallOutcome::Failed("x".to_string()).is_active());
    }
}
