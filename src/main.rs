//! wordpulse CLI entry point

use anyhow::{Context, Result};
use log::LevelFilter;
use std::str::FromStr;
use std::time::Instant;
use wordpulse::config::cli::{Cli, ExecutionMode};
use wordpulse::config::validator::validate_config;
use wordpulse::config::{resolve_config, Config};
use wordpulse::distributed::{self, Coordinator, NodeService, RunOutcome};
use wordpulse::output::{self, RunSummary};
use wordpulse::TaskList;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Resolve first so TOML log settings apply, then validate with logging on.
    let config = resolve_config(&cli).context("Configuration validation failed")?;
    init_logging(&config);
    validate_config(&config).context("Configuration validation failed")?;

    println!("wordpulse v{}", env!("CARGO_PKG_VERSION"));
    println!("Distributed word-frequency counter");
    println!();
    log::debug!("Role: {} ({:?} mode)", config.role(), config.runtime.mode);

    match config.runtime.mode {
        ExecutionMode::Standalone => run_standalone(config),
        ExecutionMode::Service => run_service(config),
        ExecutionMode::Coordinator => run_coordinator(config),
    }
}

/// Configure the `log` backend
///
/// `--log-level` wins over `RUST_LOG`; `--debug` raises the default to debug.
fn init_logging(config: &Config) {
    let default_filter = if config.runtime.debug { "debug" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    builder.format_timestamp_millis();
    if let Some(level) = config.runtime.log_level.as_deref() {
        if let Ok(filter) = LevelFilter::from_str(level) {
            builder.filter_level(filter);
        }
    }
    let _ = builder.try_init();
}

/// Load the task list and print what will be counted
fn load_tasks(config: &Config) -> Result<TaskList> {
    let tasks = TaskList::from_file(&config.tasks.file_list, config.tasks.max_files)?;
    println!(
        "Task list: {} ({} files)",
        config.tasks.file_list.display(),
        tasks.len()
    );
    Ok(tasks)
}

/// Report unreadable task files without counting anything
fn dry_run(tasks: &TaskList) -> Result<()> {
    let unreachable = tasks.unreachable();
    if unreachable.is_empty() {
        println!("All {} files are readable", tasks.len());
    } else {
        println!("{} of {} files cannot be read:", unreachable.len(), tasks.len());
        for (index, path) in &unreachable {
            println!("  [{}] {}", index, path.display());
        }
    }
    println!();
    println!("Dry run mode - task list validated successfully");
    Ok(())
}

/// Run in standalone mode (coordinator plus in-process workers)
fn run_standalone(config: Config) -> Result<()> {
    let tasks = load_tasks(&config)?;
    if config.runtime.dry_run {
        return dry_run(&tasks);
    }

    let workers = config.workers.count;
    println!("Workers: {}", workers);
    println!();

    let start = Instant::now();
    let outcome = if workers == 0 {
        Coordinator::new(tasks).run_single_process()?
    } else {
        let runtime = tokio::runtime::Runtime::new()
            .context("Failed to create tokio runtime")?;
        runtime.block_on(distributed::run_in_process(tasks, workers))?
    };

    finish(&config, &outcome, start)
}

/// Run in service mode (worker endpoint for remote coordinators)
fn run_service(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = NodeService::bind(config.workers.listen_port)
            .await
            .context("Failed to create worker service")?;

        service.run(config.workers.once).await
    })
}

/// Run in coordinator mode (remote worker services)
fn run_coordinator(config: Config) -> Result<()> {
    let tasks = load_tasks(&config)?;
    if config.runtime.dry_run {
        return dry_run(&tasks);
    }

    println!("Worker services: {}", config.workers.host_list.len());
    println!();

    let start = Instant::now();
    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    let outcome = runtime.block_on(async {
        let streams = distributed::connect_workers(&config.workers.host_list).await?;
        Coordinator::new(tasks)
            .run(streams)
            .await
            .context("Distributed run failed")
    })?;

    finish(&config, &outcome, start)
}

/// Write the report and summaries for a completed run
fn finish(config: &Config, outcome: &RunOutcome, start: Instant) -> Result<()> {
    output::write_report(&config.output.csv_output, &outcome.histogram)?;
    let elapsed = start.elapsed();

    println!("Results written to {}", config.output.csv_output.display());
    println!();
    output::print_summary(outcome, elapsed);

    if let Some(path) = &config.output.json_output {
        let summary = RunSummary::from_outcome(outcome, elapsed);
        output::write_json_summary(path, &summary)?;
        println!("JSON summary written to {}", path.display());
    }

    Ok(())
}
