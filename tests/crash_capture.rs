//! Exercises the real process panic hook, so everything lives in one test.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use kawaii_boot::crash::{CrashGuard, InstallOutcome, MemorySink, ProcessHooks};

static PREVIOUS_HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn test_panic_is_reported_then_chained() {
    panic::set_hook(Box::new(|_| {
        PREVIOUS_HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }));

    let sink = Arc::new(MemorySink::new());
    let guard = CrashGuard::new(sink.clone());

    assert_eq!(guard.install(&ProcessHooks), InstallOutcome::Installed);
    assert_eq!(guard.install(&ProcessHooks), InstallOutcome::AlreadyInstalled);

    let result = thread::Builder::new()
        .name("doodle-worker".to_string())
        .spawn(|| panic!("brush exploded"))
        .unwrap()
        .join();
    assert!(result.is_err());

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.message, "brush exploded");
    assert_eq!(report.thread_name.as_deref(), Some("doodle-worker"));
    assert!(report
        .location
        .as_deref()
        .is_some_and(|loc| loc.contains("crash_capture.rs")));

    // Previous hook runs once, after capture
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(guard.captured_reports(), 1);
    assert_eq!(guard.capture_failures(), 0);

    // A caught panic still reaches the hook
    let caught = panic::catch_unwind(|| panic!("caught later"));
    assert!(caught.is_err());
    assert_eq!(sink.len(), 2);
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 2);

    let _ = panic::take_hook();
}
