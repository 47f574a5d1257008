use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use kawaii_boot::crash::CrashConfig;

mod cli;
mod command;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let crash = CrashConfig {
        report_file: cli.crash_log.clone(),
        include_backtrace: !cli.no_backtrace,
        abort_after_report: cli.abort_on_panic,
    };
    let config_path = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => command::run_startup(crash, config_path).await?,
        Commands::Status => command::run_status(config_path).await?,
        Commands::CrashTest { message } => command::run_crash_test(crash, message).await?,
    }

    Ok(())
}
