//! Error taxonomy for counting and the coordinator/worker protocol
//!
//! Only `FileUnavailable` is recoverable: the file contributes zero words and
//! the run continues. Every other variant aborts the whole run.

use crate::distributed::protocol::{Label, WorkerId};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for histogram, tokenizer and protocol operations.
pub type CountResult<T, E = WordCountError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WordCountError {
    /// Histogram or buffer growth failed.
    #[error("resource exhaustion: could not grow {what} to {requested} entries")]
    ResourceExhaustion {
        what: &'static str,
        requested: usize,
    },

    /// A word's frequency no longer fits in a `u64`.
    #[error("frequency overflow for word {word:?}")]
    FrequencyOverflow { word: String },

    /// An input file could not be opened or read.
    #[error("file unavailable: {}: {source}", path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A message arrived with a label the protocol state does not allow.
    #[error("protocol violation ({peer}): {detail}")]
    ProtocolViolation { peer: String, detail: String },

    /// Connection-level failure (I/O, framing, codec).
    #[error("transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Message body could not be encoded or decoded.
    #[error("codec error for {label:?} message: {detail}")]
    Codec { label: Label, detail: String },

    /// A worker reported a fatal error and left the run.
    #[error("{worker} aborted the run: {reason}")]
    WorkerAborted { worker: WorkerId, reason: String },
}

impl WordCountError {
    pub fn protocol(peer: impl ToString, detail: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            peer: peer.to_string(),
            detail: detail.into(),
        }
    }

    pub fn transport(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Transport {
            context: context.into(),
            source,
        }
    }

    /// True for the one error kind a caller handles by skipping the file.
    pub fn is_file_unavailable(&self) -> bool {
        matches!(self, Self::FileUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_file_unavailable_is_recoverable() {
        let missing = WordCountError::FileUnavailable {
            path: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(missing.is_file_unavailable());

        let violation = WordCountError::protocol(WorkerId::new(3), "HistFreq before HistWord");
        assert!(!violation.is_file_unavailable());
        assert_eq!(
            violation.to_string(),
            "protocol violation (worker-3): HistFreq before HistWord"
        );
    }
}
