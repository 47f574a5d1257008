use std::path::Path;

use anyhow::Result;

use kawaii_boot::service::{default_config_path, load_service_config};
use kawaii_boot::telemetry::{is_telemetry_enabled, DISABLE_TELEMETRY_ENV};

pub async fn run_status(config_path: Option<&Path>) -> Result<()> {
    if is_telemetry_enabled() {
        println!("✅ Telemetry enabled");
    } else {
        println!("❌ Telemetry disabled by {}", DISABLE_TELEMETRY_ENV);
    }

    match load_service_config(config_path) {
        Ok(Some(resolved)) => {
            println!("✅ Service config found");
            println!("   Source: {}", resolved.source);
            println!("   Project: {}", resolved.config.project_id);
            match resolved.config.validate() {
                Ok(()) => println!("   Valid: yes"),
                Err(e) => println!("⚠️  Config is invalid: {}", e),
            }
        }
        Ok(None) => {
            println!("❌ No service config");
            if let Some(path) = default_config_path() {
                println!("   Create {} or set KAWAII_* variables.", path.display());
            }
        }
        Err(e) => println!("⚠️  Service config unreadable: {:#}", e),
    }

    Ok(())
}
