use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kawaii Doodle startup - crash capture and service bootstrap
#[derive(Parser)]
#[command(name = "kawaii-boot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Service config file. Defaults to ~/.kawaii-doodle/service.json
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Append crash reports as JSON lines to this file
    #[arg(long, global = true, env = "KAWAII_CRASH_LOG")]
    pub crash_log: Option<PathBuf>,

    /// Skip backtrace capture in crash reports
    #[arg(long, global = true)]
    pub no_backtrace: bool,

    /// Abort the process after a panic has been reported
    #[arg(long, global = true)]
    pub abort_on_panic: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the startup sequence and print what came up (default)
    Run,
    /// Show where the service config resolves from, without initializing
    Status,
    /// Install the crash guard and panic on a worker thread
    CrashTest {
        /// Panic message
        #[arg(short, long, default_value = "crash-test panic")]
        message: String,
    },
}
