//! CLI argument parsing using clap

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Standalone mode (default) - coordinator with in-process workers
    #[default]
    Standalone,
    /// Coordinator mode - dispatch to remote worker services
    Coordinator,
    /// Service mode - serve worker sessions for remote coordinators
    Service,
}

/// wordpulse - distributed word-frequency counter
#[derive(Parser, Debug)]
#[command(name = "wordpulse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, or service [default: standalone]
    #[arg(long, value_enum)]
    pub mode: Option<ExecutionMode>,

    /// Port the worker service listens on (service mode), and the default
    /// port for --host-list entries without one (coordinator mode)
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Serve one coordinator session, then exit (service mode only)
    #[arg(long)]
    pub once: bool,

    /// Comma-separated worker service addresses (e.g., "10.0.1.10:9100,10.0.1.11:9100")
    #[arg(long)]
    pub host_list: Option<String>,

    /// Number of in-process workers; 0 counts every file in the coordinator
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// File listing one input path per line
    #[arg(long, value_name = "PATH")]
    pub file_list: Option<PathBuf>,

    /// CSV report path
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Maximum number of entries read from the file list
    #[arg(long)]
    pub max_files: Option<usize>,

    /// TOML configuration file (CLI flags take precedence)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also write the run summary as JSON
    #[arg(long, value_name = "PATH")]
    pub json_output: Option<PathBuf>,

    /// Load the file list, report unreadable files, and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Log level: error, warn, info, debug, trace (overrides RUST_LOG)
    #[arg(long, env = "WORDPULSE_LOG")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate flag combinations against the resolved execution mode
    ///
    /// `mode` is the mode after TOML and CLI are merged, which may come from
    /// the config file rather than `--mode`.
    pub fn validate(&self, mode: ExecutionMode) -> anyhow::Result<()> {
        if self.listen_port.is_some() && mode == ExecutionMode::Standalone {
            anyhow::bail!("--listen-port is not used in standalone mode");
        }

        if self.once && mode != ExecutionMode::Service {
            anyhow::bail!("--once is only valid in service mode");
        }

        if self.host_list.is_some() && mode != ExecutionMode::Coordinator {
            anyhow::bail!("--host-list is only valid in coordinator mode");
        }

        if self.workers.is_some() && mode != ExecutionMode::Standalone {
            anyhow::bail!("--workers is only valid in standalone mode; coordinator mode uses one worker per --host-list entry");
        }

        Ok(())
    }
}

/// Split a comma-separated host list, dropping empty entries
///
/// Entries without a port get `default_port`.
pub fn parse_host_list(list: &str, default_port: u16) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(|host| {
            if host.contains(':') {
                host.to_string()
            } else {
                format!("{}:{}", host, default_port)
            }
        })
        .collect()
}
