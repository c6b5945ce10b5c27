//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "align", version, about = "FSO link auto-alignment")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/align_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines and print results as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the alignment loop until Ctrl-C (or --ticks)
    Run {
        /// Drive the simulated link instead of the real units
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
        /// Stop after this many loop iterations
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Append scan samples to this file (overrides [record] path)
        #[arg(long, value_name = "FILE")]
        record: Option<PathBuf>,
        /// Poll the peer inside the control loop instead of on a background thread
        #[arg(long, action = ArgAction::SetTrue)]
        direct: bool,
    },
    /// Validate the config and poll both units once
    SelfCheck {
        /// Check against the simulated link
        #[arg(long, action = ArgAction::SetTrue)]
        sim: bool,
    },
    /// Summarise a scan record file
    ScanReport {
        /// Record written by `run --record`
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}
