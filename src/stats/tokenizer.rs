//! Byte-stream tokenizer
//!
//! Splits raw bytes into case-folded ASCII alphanumeric tokens and counts them
//! into a [`Histogram`]. Every non-alphanumeric byte ends the current token;
//! runs of separators never produce empty tokens. Tokens longer than
//! [`MAX_TOKEN_CHARS`] keep their first characters and drop the rest up to the
//! next separator.

use crate::error::{CountResult, WordCountError};
use crate::stats::histogram::{Histogram, WordToken, MAX_TOKEN_CHARS};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

/// Incremental token builder
///
/// Feed bytes with [`push`](Self::push); a completed token is returned when a
/// separator closes it. Call [`finish`](Self::finish) at end of stream to
/// flush a pending token.
#[derive(Debug, Default)]
pub struct TokenAccumulator {
    buf: String,
}

impl TokenAccumulator {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(MAX_TOKEN_CHARS),
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) -> Option<WordToken> {
        if byte.is_ascii_alphanumeric() {
            if self.buf.len() < MAX_TOKEN_CHARS {
                self.buf.push(byte.to_ascii_lowercase() as char);
            }
            None
        } else {
            self.take()
        }
    }

    pub fn finish(&mut self) -> Option<WordToken> {
        self.take()
    }

    fn take(&mut self) -> Option<WordToken> {
        if self.buf.is_empty() {
            return None;
        }
        let word = std::mem::replace(&mut self.buf, String::with_capacity(MAX_TOKEN_CHARS));
        Some(WordToken::from_folded(word))
    }
}

/// Count every token of `bytes` into `histogram`
pub fn count_bytes(bytes: &[u8], histogram: &mut Histogram) -> CountResult<()> {
    let mut acc = TokenAccumulator::new();
    for &byte in bytes {
        if let Some(word) = acc.push(byte) {
            histogram.add_word(word)?;
        }
    }
    if let Some(word) = acc.finish() {
        histogram.add_word(word)?;
    }
    Ok(())
}

/// Build a histogram from a buffered reader
///
/// `source` names the input in a [`WordCountError::FileUnavailable`] raised
/// by a read failure; a partially read input never contributes words.
pub fn count_reader<R: BufRead>(mut reader: R, source: &Path) -> CountResult<Histogram> {
    let mut histogram = Histogram::new();
    let mut acc = TokenAccumulator::new();

    loop {
        let chunk = match reader.fill_buf() {
            Ok(chunk) => chunk,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(WordCountError::FileUnavailable {
                    path: source.to_path_buf(),
                    source: e,
                })
            }
        };
        if chunk.is_empty() {
            break;
        }
        let consumed = chunk.len();
        for &byte in chunk {
            if let Some(word) = acc.push(byte) {
                histogram.add_word(word)?;
            }
        }
        reader.consume(consumed);
    }

    if let Some(word) = acc.finish() {
        histogram.add_word(word)?;
    }
    Ok(histogram)
}

/// Build the histogram of one file
///
/// An open or read failure yields [`WordCountError::FileUnavailable`].
pub fn count_words_in_file(path: &Path) -> CountResult<Histogram> {
    let file = File::open(path).map_err(|source| WordCountError::FileUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    count_reader(BufReader::new(file), path)
}

/// Count one task file, treating an unavailable file as empty
///
/// Returns `Ok(None)` when the file could not be read; the event is logged and
/// the run continues. Any other error is fatal and propagated.
pub fn count_task_file(path: &Path) -> CountResult<Option<Histogram>> {
    match count_words_in_file(path) {
        Ok(histogram) => Ok(Some(histogram)),
        Err(e) if e.is_file_unavailable() => {
            log::warn!("Could not process file {}: {}", path.display(), e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn count(text: &str) -> Histogram {
        let mut h = Histogram::new();
        count_bytes(text.as_bytes(), &mut h).unwrap();
        h
    }

    #[test]
    fn test_sentence_histogram() {
        let h = count("The quick brown fox. The Fox runs.");
        assert_eq!(h.len(), 5);
        assert_eq!(h.get("the"), Some(2));
        assert_eq!(h.get("quick"), Some(1));
        assert_eq!(h.get("brown"), Some(1));
        assert_eq!(h.get("fox"), Some(2));
        assert_eq!(h.get("runs"), Some(1));
    }

    #[test]
    fn test_separator_runs_produce_no_empty_tokens() {
        let h = count("  ,,a--b\n\n\tc!!  ");
        assert_eq!(h.len(), 3);
        assert_eq!(h.total_words(), 3);
    }

    #[test]
    fn test_pending_token_emitted_at_end_of_stream() {
        let h = count("hello world");
        assert_eq!(h.get("world"), Some(1));
    }

    #[test]
    fn test_digits_and_mixed_tokens() {
        let h = count("Route66 route66 2024-01");
        assert_eq!(h.get("route66"), Some(2));
        assert_eq!(h.get("2024"), Some(1));
        assert_eq!(h.get("01"), Some(1));
    }

    #[test]
    fn test_non_ascii_bytes_are_separators() {
        let h = count("café naïve");
        assert_eq!(h.get("caf"), Some(1));
        assert_eq!(h.get("na"), Some(1));
        assert_eq!(h.get("ve"), Some(1));
    }

    #[test]
    fn test_long_tokens_truncate_and_collide() {
        let prefix = "x".repeat(MAX_TOKEN_CHARS);
        let text = format!("{}AAAA {}bbb", prefix, prefix.to_uppercase());
        let h = count(&text);
        assert_eq!(h.len(), 1);
        assert_eq!(h.get(&prefix), Some(2));
    }

    #[test]
    fn test_tokenizing_twice_is_idempotent() {
        let text = "one two two three three three";
        assert_eq!(count(text), count(text));
    }

    #[test]
    fn test_count_reader_matches_count_bytes_across_buffer_boundaries() {
        let text = "alpha beta gamma alpha ".repeat(500);
        // A tiny buffer forces tokens to straddle refills.
        let reader = BufReader::with_capacity(7, text.as_bytes());
        let streamed = count_reader(reader, Path::new("<memory>")).unwrap();
        assert_eq!(streamed, count(&text));
        assert_eq!(streamed.get("alpha"), Some(1000));
    }

    #[test]
    fn test_count_words_in_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "The quick brown fox.").unwrap();
        write!(f, "The Fox runs.").unwrap();
        drop(f);

        let h = count_words_in_file(&path).unwrap();
        assert_eq!(h.total_words(), 7);
        assert_eq!(h.get("the"), Some(2));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.txt");

        let err = count_words_in_file(&path).unwrap_err();
        assert!(err.is_file_unavailable());

        assert!(count_task_file(&path).unwrap().is_none());
    }
}
