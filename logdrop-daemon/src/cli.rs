//! CLI argument definitions for logdrop-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use logdrop_core::config::LogdropConfig;

/// logdrop ingestion daemon.
///
/// Watches a drop directory for TSV files, stores their rows,
/// and renders a report per unit.
#[derive(Parser, Debug)]
#[command(name = "logdrop-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logdrop.toml configuration file.
    #[arg(short, long, default_value = "/etc/logdrop/logdrop.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,

    /// Override the watched input directory.
    #[arg(long)]
    pub input_dir: Option<String>,
}

impl DaemonCli {
    /// Apply command-line overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut LogdropConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
        if let Some(input_dir) = &self.input_dir {
            config.ingest.input_dir = input_dir.clone();
        }
    }
}
