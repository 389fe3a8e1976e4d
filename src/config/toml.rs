//! TOML configuration file parsing

use super::*;
use crate::config::cli::parse_host_list;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Result<Config> {
    if let Some(mode) = cli.mode {
        config.runtime.mode = mode;
    }

    if let Some(file_list) = &cli.file_list {
        config.tasks.file_list = file_list.clone();
    }
    if let Some(max_files) = cli.max_files {
        config.tasks.max_files = max_files;
    }

    if let Some(count) = cli.workers {
        config.workers.count = count;
    }
    if let Some(port) = cli.listen_port {
        config.workers.listen_port = port;
    }
    if let Some(hosts) = &cli.host_list {
        config.workers.host_list = parse_host_list(hosts, config.workers.listen_port);
    }
    if cli.once {
        config.workers.once = true;
    }

    if let Some(output) = &cli.output {
        config.output.csv_output = output.clone();
    }
    if let Some(json) = &cli.json_output {
        config.output.json_output = Some(json.clone());
    }

    if cli.dry_run {
        config.runtime.dry_run = true;
    }
    if cli.debug {
        config.runtime.debug = true;
    }
    if let Some(level) = &cli.log_level {
        config.runtime.log_level = Some(level.clone());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_toml_basic() {
        let toml = r#"
[tasks]
file_list = "/data/inputs.txt"
max_files = 500

[workers]
count = 4

[output]
csv_output = "/tmp/freq.csv"
json_output = "/tmp/summary.json"
"#;

        let config = parse_toml_string(toml).unwrap();
        assert_eq!(config.tasks.file_list, PathBuf::from("/data/inputs.txt"));
        assert_eq!(config.tasks.max_files, 500);
        assert_eq!(config.workers.count, 4);
        assert_eq!(config.workers.listen_port, 9100);
        assert_eq!(config.output.json_output, Some(PathBuf::from("/tmp/summary.json")));
    }

    #[test]
    fn test_parse_toml_coordinator() {
        let toml = r#"
[workers]
host_list = ["node1:9100", "node2:9100"]

[runtime]
mode = "coordinator"
log_level = "debug"
"#;

        let config = parse_toml_string(toml).unwrap();
        assert_eq!(config.runtime.mode, ExecutionMode::Coordinator);
        assert_eq!(config.workers.host_list.len(), 2);
        assert_eq!(config.runtime.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(parse_toml_string("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(parse_toml_string("[runtime]\nmode = \"cluster\"\n").is_err());
    }

    #[test]
    fn test_cli_overrides_toml() {
        let config = parse_toml_string(
            "[tasks]\nmax_files = 500\n[workers]\ncount = 4\n[output]\ncsv_output = \"a.csv\"\n",
        )
        .unwrap();
        let cli = Cli::parse_from(["wordpulse", "-w", "2", "--output", "b.csv"]);

        let merged = merge_cli_with_config(&cli, config).unwrap();
        assert_eq!(merged.workers.count, 2);
        assert_eq!(merged.output.csv_output, PathBuf::from("b.csv"));
        // Not given on the command line: the TOML value stays.
        assert_eq!(merged.tasks.max_files, 500);
    }

    #[test]
    fn test_toml_mode_kept_unless_cli_mode_given() {
        let toml = "[runtime]\nmode = \"coordinator\"\n";

        let cli = Cli::parse_from(["wordpulse"]);
        let merged = merge_cli_with_config(&cli, parse_toml_string(toml).unwrap()).unwrap();
        assert_eq!(merged.runtime.mode, ExecutionMode::Coordinator);

        let cli = Cli::parse_from(["wordpulse", "--mode", "service"]);
        let merged = merge_cli_with_config(&cli, parse_toml_string(toml).unwrap()).unwrap();
        assert_eq!(merged.runtime.mode, ExecutionMode::Service);
    }
}
