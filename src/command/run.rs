use std::path::Path;

use anyhow::Result;

use kawaii_boot::crash::{CrashConfig, InstallOutcome};
use kawaii_boot::host::{PluginHost, PluginRegistry};
use kawaii_boot::startup::{self, ServiceStatus, StartupOptions};

pub async fn run_startup(crash: CrashConfig, config_path: Option<&Path>) -> Result<()> {
    let options = StartupOptions::resolve(crash, config_path);
    let report = startup::on_application_create(&options);

    let host = PluginRegistry::new();
    startup::on_activity_create(&host)?;
    host.begin_dispatch();

    match &report.crash {
        InstallOutcome::Installed => println!("✅ Crash guard installed"),
        InstallOutcome::AlreadyInstalled => println!("✅ Crash guard already installed"),
        InstallOutcome::Failed(cause) => println!("❌ Crash guard not installed: {}", cause),
    }
    if report.web_debugging {
        println!("✅ Web contents debugging enabled");
    }
    match &report.service {
        ServiceStatus::Degraded(_) => println!("⚠️  Service {}", report.service),
        ServiceStatus::Disabled(_) => println!("ℹ️  Service {}", report.service),
        _ => println!("✅ Service {}", report.service),
    }
    println!("   Plugins: {}", host.plugins().join(", "));

    if report.is_degraded() {
        println!("\n⚠️  Running in degraded mode; see the log for details.");
    }

    Ok(())
}
