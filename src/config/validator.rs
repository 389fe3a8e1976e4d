//! Configuration validation

use super::*;
use anyhow::Result;
use std::collections::HashSet;
use std::str::FromStr;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_tasks(&config.tasks)?;
    validate_workers(&config.workers, config.runtime.mode)?;
    validate_output(&config.output)?;
    validate_runtime(&config.runtime)?;

    Ok(())
}

/// Validate task list configuration
pub fn validate_tasks(tasks: &TaskConfig) -> Result<()> {
    if tasks.max_files == 0 {
        anyhow::bail!("tasks.max_files must be at least 1");
    }

    if tasks.file_list.as_os_str().is_empty() {
        anyhow::bail!("tasks.file_list must not be empty");
    }

    Ok(())
}

/// Validate workers configuration
pub fn validate_workers(workers: &WorkerConfig, mode: ExecutionMode) -> Result<()> {
    if mode == ExecutionMode::Coordinator {
        if workers.host_list.is_empty() {
            anyhow::bail!("coordinator mode requires at least one worker address (--host-list)");
        }

        let mut seen = HashSet::new();
        for host in &workers.host_list {
            if !seen.insert(host.as_str()) {
                anyhow::bail!("duplicate worker address in host list: {}", host);
            }
        }
    }

    // Warn if worker count is very high
    if mode == ExecutionMode::Standalone && workers.count > 1024 {
        log::warn!(
            "Very high worker count ({}), this may cause performance issues",
            workers.count
        );
    }

    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.csv_output.as_os_str().is_empty() {
        anyhow::bail!("output.csv_output must not be empty");
    }

    if let Some(json) = &output.json_output {
        if json == &output.csv_output {
            anyhow::bail!("json_output and csv_output must be different files");
        }
    }

    Ok(())
}

/// Validate runtime configuration
pub fn validate_runtime(runtime: &RuntimeConfig) -> Result<()> {
    if let Some(level) = &runtime.log_level {
        if log::LevelFilter::from_str(level).is_err() {
            anyhow::bail!(
                "invalid log level '{}' (expected error, warn, info, debug, trace, or off)",
                level
            );
        }
    }

    Ok(())
}
