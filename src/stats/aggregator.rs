//! Global histogram aggregation
//!
//! The coordinator is the only owner of the global histogram. Partial results
//! arrive either as single-file histograms (zero-worker mode) or as one
//! drained histogram per worker; both go through [`GlobalAggregator::merge`].
//!
//! # Example
//!
//! ```
//! use wordpulse::stats::{GlobalAggregator, Histogram, MergeSource, count_bytes};
//! use wordpulse::distributed::WorkerId;
//!
//! let mut first = Histogram::new();
//! count_bytes(b"the quick fox", &mut first).unwrap();
//! let mut second = Histogram::new();
//! count_bytes(b"the lazy dog", &mut second).unwrap();
//!
//! let mut aggregator = GlobalAggregator::new();
//! aggregator.merge(MergeSource::Worker(WorkerId::new(1)), &second).unwrap();
//! aggregator.merge(MergeSource::Worker(WorkerId::new(0)), &first).unwrap();
//!
//! let global = aggregator.into_histogram();
//! assert_eq!(global.get("the"), Some(2));
//! assert_eq!(global.total_words(), 6);
//! ```

use crate::distributed::protocol::WorkerId;
use crate::error::CountResult;
use crate::stats::histogram::Histogram;
use std::fmt;

/// Where a partial histogram came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSource {
    /// One file counted directly by the coordinator
    File(usize),
    /// The final histogram drained from a worker
    Worker(WorkerId),
}

impl fmt::Display for MergeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeSource::File(index) => write!(f, "task {}", index),
            MergeSource::Worker(id) => write!(f, "{}", id),
        }
    }
}

/// Owner of the global histogram
#[derive(Debug, Default)]
pub struct GlobalAggregator {
    global: Histogram,
    merged: Vec<MergeSource>,
}

impl GlobalAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one partial histogram into the global one
    pub fn merge(&mut self, source: MergeSource, partial: &Histogram) -> CountResult<()> {
        self.global.merge(partial)?;
        log::debug!(
            "Merged {} ({} unique words); global now {} unique words",
            source,
            partial.len(),
            self.global.len()
        );
        self.merged.push(source);
        Ok(())
    }

    /// Sources merged so far, in arrival order
    pub fn merged_sources(&self) -> &[MergeSource] {
        &self.merged
    }

    pub fn global(&self) -> &Histogram {
        &self.global
    }

    pub fn into_histogram(self) -> Histogram {
        self.global
    }
}
