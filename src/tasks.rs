//! Task list loading
//!
//! The task list is a newline-delimited file of input paths, read once before
//! any dispatch. Each non-blank line is one task; its position in the list is
//! the task index used on the wire and in the dispatch cursor.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Default bound on the number of tasks kept from a list
pub const DEFAULT_MAX_FILES: usize = 100;

/// Ordered list of input files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    paths: Vec<PathBuf>,
}

impl TaskList {
    /// Load a task list from disk
    ///
    /// Failure to read the list itself is fatal for the run.
    pub fn from_file(path: &Path, max_files: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task list {}", path.display()))?;
        let list = Self::from_string(&content, max_files);
        log::info!("Loaded {} tasks from {}", list.len(), path.display());
        Ok(list)
    }

    /// Parse newline-delimited paths
    ///
    /// Trailing `\r` is stripped, blank lines are skipped, and at most
    /// `max_files` entries are kept.
    pub fn from_string(content: &str, max_files: usize) -> Self {
        let mut paths = Vec::new();
        let mut ignored = 0usize;

        for line in content.split('\n') {
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            if paths.len() < max_files {
                paths.push(PathBuf::from(line));
            } else {
                ignored += 1;
            }
        }

        if ignored > 0 {
            log::warn!(
                "Task list exceeds {} entries; ignoring {} further paths",
                max_files,
                ignored
            );
        }

        Self { paths }
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Paths that cannot currently be opened for reading, in list order
    ///
    /// Probes every entry in parallel. Used by `--dry-run`; a real run still
    /// tolerates these files and counts them as empty.
    pub fn unreachable(&self) -> Vec<(usize, PathBuf)> {
        let mut missing: Vec<(usize, PathBuf)> = self
            .paths
            .par_iter()
            .enumerate()
            .filter(|(_, path)| std::fs::File::open(path).is_err())
            .map(|(index, path)| (index, path.clone()))
            .collect();
        missing.sort_by_key(|(index, _)| *index);
        missing
    }
}
