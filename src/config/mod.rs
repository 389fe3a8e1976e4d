//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//! Values are resolved in three layers: built-in defaults, then an optional
//! TOML file, then command-line flags.

pub mod cli;
pub mod toml;
pub mod validator;

use anyhow::Result;
use cli::{Cli, ExecutionMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Task list configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Newline-delimited list of input files
    #[serde(default = "default_file_list")]
    pub file_list: PathBuf,
    /// Maximum number of entries read from the list
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_file_list() -> PathBuf {
    PathBuf::from("filelist.txt")
}

fn default_max_files() -> usize {
    crate::tasks::DEFAULT_MAX_FILES
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            file_list: default_file_list(),
            max_files: default_max_files(),
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// In-process workers (standalone mode); 0 counts without workers
    #[serde(default = "default_worker_count")]
    pub count: usize,
    /// Worker service addresses (coordinator mode)
    #[serde(default)]
    pub host_list: Vec<String>,
    /// Port the worker service listens on (service mode)
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Serve a single coordinator session and exit (service mode)
    #[serde(default)]
    pub once: bool,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_listen_port() -> u16 {
    9100
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            host_list: Vec::new(),
            listen_port: default_listen_port(),
            once: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV report path
    #[serde(default = "default_csv_output")]
    pub csv_output: PathBuf,
    /// JSON run summary path
    pub json_output: Option<PathBuf>,
}

fn default_csv_output() -> PathBuf {
    PathBuf::from("word_frequencies.csv")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_output: default_csv_output(),
            json_output: None,
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Load and check the task list without counting
    #[serde(default)]
    pub dry_run: bool,
    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
    /// Log filter (error, warn, info, debug, trace)
    pub log_level: Option<String>,
}

/// Role of this process in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns the task list and the global histogram
    Coordinator,
    /// Counts assigned files into a local histogram
    Worker,
}

impl Role {
    pub fn for_mode(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Standalone | ExecutionMode::Coordinator => Role::Coordinator,
            ExecutionMode::Service => Role::Worker,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => write!(f, "coordinator"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

impl Config {
    pub fn role(&self) -> Role {
        Role::for_mode(self.runtime.mode)
    }
}

/// Merge `--config` (if given) with the CLI overrides
///
/// Checks flag combinations against the resolved mode but does not run the
/// value checks of [`validator::validate_config`].
pub fn resolve_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => toml::parse_toml_file(path)?,
        None => Config::default(),
    };
    let config = toml::merge_cli_with_config(cli, base)?;
    cli.validate(config.runtime.mode)?;
    Ok(config)
}

/// Resolve and validate the full configuration for a command line
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = resolve_config(cli)?;
    validator::validate_config(&config)?;
    Ok(config)
}
