//! wordpulse - distributed word-frequency counter
//!
//! wordpulse counts case-folded alphanumeric words across a list of text
//! files and writes one sorted `word,frequency` CSV report.
//!
//! # Architecture
//!
//! - **Tokenizer**: byte stream to case-folded tokens, bounded length
//! - **Histogram**: growable word/frequency table with direct-addition merge
//! - **Coordinator**: owns the task list and global histogram; dispatches one
//!   file at a time to whichever worker reports ready first
//! - **Workers**: in-process tasks or remote TCP services, each returning one
//!   consolidated histogram when terminated
//! - **Output**: CSV report, console summary, optional JSON summary

pub mod config;
pub mod distributed;
pub mod error;
pub mod output;
pub mod stats;
pub mod tasks;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use error::{CountResult, WordCountError};
pub use stats::Histogram;
pub use tasks::TaskList;

/// Result type used at the application boundary
pub type Result<T> = anyhow::Result<T>;
