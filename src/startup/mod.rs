//! Startup sequencing.
//!
//! The application-level hook is the only place that initializes the
//! external service. It runs, in order:
//! 1. crash guard install, so every later failure is captured
//! 2. web-content debugging switch
//! 3. service bootstrap
//!
//! Activity-level hooks only register capabilities with the UI bridge.
//! Every step is a failure boundary: a problem is logged and reflected in
//! the [`StartupReport`], never raised.

mod sequence;

pub use sequence::{
    on_activity_create, on_application_create, Bootstrap, DisabledReason, ServiceSettings,
    ServiceStatus, StartupOptions, StartupReport,
};
