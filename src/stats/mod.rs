//! Word statistics
//!
//! - `histogram`: word tokens and the word-frequency histogram with its merge
//! - `tokenizer`: byte stream to histogram
//! - `aggregator`: the coordinator's global histogram and merge bookkeeping

pub mod aggregator;
pub mod histogram;
pub mod tokenizer;

pub use aggregator::{GlobalAggregator, MergeSource};
pub use histogram::{Histogram, WordFreq, WordToken, MAX_TOKEN_CHARS, MAX_WORD_LEN};
pub use tokenizer::{count_bytes, count_task_file, count_words_in_file};
