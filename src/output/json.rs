//! JSON run summary
//!
//! The same figures as the console summary, plus per-worker detail and a
//! generation timestamp, for consumption by scripts.

use crate::distributed::RunOutcome;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummaryJson {
    pub worker_id: usize,
    pub node_id: String,
    pub tasks_completed: usize,
    pub unique_words: usize,
}

/// Summary of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    /// Coordinator plus workers
    pub participants: usize,
    pub workers: usize,
    pub files_dispatched: usize,
    pub unique_words: usize,
    pub total_words: u64,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub per_worker: Vec<WorkerSummaryJson>,
}

impl RunSummary {
    pub fn from_outcome(outcome: &RunOutcome, elapsed: Duration) -> Self {
        Self {
            generated_at: Utc::now(),
            participants: outcome.workers.len() + 1,
            workers: outcome.workers.len(),
            files_dispatched: outcome.files_dispatched,
            unique_words: outcome.histogram.len(),
            total_words: outcome.histogram.total_words(),
            elapsed_secs: elapsed.as_secs_f64(),
            per_worker: outcome
                .workers
                .iter()
                .map(|w| WorkerSummaryJson {
                    worker_id: w.worker_id.index(),
                    node_id: w.node_id.clone(),
                    tasks_completed: w.tasks_completed,
                    unique_words: w.unique_words,
                })
                .collect(),
        }
    }
}

/// Write the summary as pretty-printed JSON
pub fn write_json_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create JSON output {}", path.display()))?;
    serde_json::to_writer_pretty(file, summary)
        .with_context(|| format!("Failed to write JSON output {}", path.display()))?;
    Ok(())
}
