use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::crash::{CrashConfig, HookRegistry, InstallOutcome, ProcessHooks};
use crate::host::{HostError, Instrumentation, PluginHost, WebDebugging, WALLPAPER_PLUGIN};
use crate::runtime::{self, Runtime};
use crate::service::{load_service_config, InitOutcome, ServiceConfig};
use crate::tags;
use crate::telemetry::is_telemetry_enabled;

/// What the startup sequence knows about the service configuration.
#[derive(Debug, Clone)]
pub enum ServiceSettings {
    Configured(ServiceConfig),
    /// No configuration source was present
    Missing,
    /// A configuration source was present but unreadable
    Invalid(String),
}

/// Inputs to the application-level startup hook.
#[derive(Debug, Clone)]
pub struct StartupOptions {
    pub crash: CrashConfig,
    pub service: ServiceSettings,
    pub telemetry_enabled: bool,
}

impl StartupOptions {
    pub fn new(crash: CrashConfig, service: ServiceConfig) -> Self {
        Self {
            crash,
            service: ServiceSettings::Configured(service),
            telemetry_enabled: true,
        }
    }

    /// Resolve options from the environment and config file.
    ///
    /// A config that cannot be loaded is recorded, not raised.
    pub fn resolve(crash: CrashConfig, config_path: Option<&Path>) -> Self {
        let service = match load_service_config(config_path) {
            Ok(Some(resolved)) => ServiceSettings::Configured(resolved.config),
            Ok(None) => ServiceSettings::Missing,
            Err(e) => {
                warn!(target: tags::SERVICE, "Failed to load service config: {:#}", e);
                ServiceSettings::Invalid(format!("{:#}", e))
            }
        };
        Self {
            crash,
            service,
            telemetry_enabled: is_telemetry_enabled(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisabledReason {
    TelemetryOptOut,
    NotConfigured,
}

/// State of the external service after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Initialized by this startup
    Ready,
    /// Initialized by an earlier caller
    AlreadyReady,
    /// Deliberately not initialized
    Disabled(DisabledReason),
    /// Initialization failed; running without the service
    Degraded(String),
}

impl ServiceStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ServiceStatus::Ready | ServiceStatus::AlreadyReady)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Ready => write!(f, "ready"),
            ServiceStatus::AlreadyReady => write!(f, "ready (already initialized)"),
            ServiceStatus::Disabled(DisabledReason::TelemetryOptOut) => {
                write!(f, "disabled (telemetry opt-out)")
            }
            ServiceStatus::Disabled(DisabledReason::NotConfigured) => {
                write!(f, "disabled (no configuration)")
            }
            ServiceStatus::Degraded(cause) => write!(f, "degraded: {}", cause),
        }
    }
}

/// Outcome of the application-level startup hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    pub crash: InstallOutcome,
    pub web_debugging: bool,
    pub service: ServiceStatus,
}

impl StartupReport {
    /// Running with reduced observability
    pub fn is_degraded(&self) -> bool {
        !self.crash.is_active() || matches!(self.service, ServiceStatus::Degraded(_))
    }
}

/// The fixed startup sequence, bound to a runtime and its collaborators.
pub struct Bootstrap<'a> {
    runtime: &'a Runtime,
    hooks: &'a dyn HookRegistry,
    instrumentation: &'a dyn Instrumentation,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        runtime: &'a Runtime,
        hooks: &'a dyn HookRegistry,
        instrumentation: &'a dyn Instrumentation,
    ) -> Self {
        Self {
            runtime,
            hooks,
            instrumentation,
        }
    }

    /// Application-level hook. Safe to call more than once and from several
    /// threads; later calls find everything already in place.
    pub fn on_application_create(&self, options: &StartupOptions) -> StartupReport {
        // Step 1: crash guard before anything else can fail
        let crash = self.runtime.crash().install(self.hooks);

        // Step 2: debug instrumentation, unconditionally
        self.instrumentation.set_web_debugging(true);

        // Step 3: external service
        let service = self.ensure_service(options);

        info!(crash = ?crash, service = %service, "Application startup complete");
        StartupReport {
            crash,
            web_debugging: self.instrumentation.web_debugging(),
            service,
        }
    }

    /// Activity-level hook: registers capabilities only.
    pub fn on_activity_create(&self, host: &dyn PluginHost) -> Result<(), HostError> {
        register_capabilities(host, self.runtime.crash().is_installed())
    }

    fn ensure_service(&self, options: &StartupOptions) -> ServiceStatus {
        if !options.telemetry_enabled {
            info!(target: tags::SERVICE, "Telemetry disabled; skipping service initialization");
            return ServiceStatus::Disabled(DisabledReason::TelemetryOptOut);
        }

        let config = match &options.service {
            ServiceSettings::Configured(config) => config,
            ServiceSettings::Missing => {
                info!(target: tags::SERVICE, "No service config found; running without it");
                return ServiceStatus::Disabled(DisabledReason::NotConfigured);
            }
            ServiceSettings::Invalid(cause) => return ServiceStatus::Degraded(cause.clone()),
        };

        match self.runtime.service().ensure_initialized(config) {
            Ok(InitOutcome::Initialized) => ServiceStatus::Ready,
            Ok(InitOutcome::AlreadyInitialized) => ServiceStatus::AlreadyReady,
            Err(err) => ServiceStatus::Degraded(err.cause()),
        }
    }
}

fn register_capabilities(
    host: &dyn PluginHost,
    crash_guard_installed: bool,
) -> Result<(), HostError> {
    if !crash_guard_installed {
        warn!(
            target: tags::GLOBAL,
            "Activity created before the crash guard was installed; failures may go unreported"
        );
    }
    host.register_plugin(WALLPAPER_PLUGIN)
}

/// Run the application-level hook against the process-wide runtime.
pub fn on_application_create(options: &StartupOptions) -> StartupReport {
    let rt = runtime::init(&options.crash);
    Bootstrap::new(rt, &ProcessHooks, &WebDebugging).on_application_create(options)
}

/// Run the activity-level hook against the process-wide runtime.
pub fn on_activity_create(host: &dyn PluginHost) -> Result<(), HostError> {
    register_capabilities(host, runtime::crash_guard_installed())
}
