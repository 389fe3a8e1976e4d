//! Word-frequency histogram
//!
//! A histogram is a growable vector of `(word, frequency)` entries with unique
//! words. Lookup is a linear scan over the distinct words: vocabularies are
//! small compared to token counts, and a flat vector keeps the wire order of a
//! worker's entries stable.
//!
//! Storage grows by doubling from [`INITIAL_CAPACITY`] and never shrinks.
//! Growth goes through `try_reserve_exact` so an allocation failure surfaces
//! as [`WordCountError::ResourceExhaustion`] instead of aborting the process.

use crate::error::{CountResult, WordCountError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of a word slot in the historic fixed-size wire format
///
/// One slot was reserved for the terminator, leaving [`MAX_TOKEN_CHARS`]
/// usable characters. The bound is kept so truncation is identical across
/// every participant.
pub const MAX_WORD_LEN: usize = 100;

/// Maximum number of characters kept from a token
pub const MAX_TOKEN_CHARS: usize = MAX_WORD_LEN - 1;

/// Entry capacity reserved on the first insertion
pub const INITIAL_CAPACITY: usize = 64;

/// Case-folded alphanumeric word, at most [`MAX_TOKEN_CHARS`] long
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WordToken(String);

impl WordToken {
    /// Fold an arbitrary word into a token
    ///
    /// ASCII letters are lower-cased and anything past [`MAX_TOKEN_CHARS`] is
    /// dropped. Returns `None` for an empty word or one containing a
    /// non-alphanumeric character.
    pub fn fold(raw: &str) -> Option<Self> {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        let folded: String = raw
            .bytes()
            .take(MAX_TOKEN_CHARS)
            .map(|b| b.to_ascii_lowercase() as char)
            .collect();
        Some(Self(folded))
    }

    /// Build from a buffer the tokenizer already folded and bounded
    pub(crate) fn from_folded(folded: String) -> Self {
        debug_assert!(!folded.is_empty() && folded.len() <= MAX_TOKEN_CHARS);
        Self(folded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for WordToken {
    type Error = String;

    /// Accepts only words that are already in canonical form
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let canonical = !value.is_empty()
            && value.len() <= MAX_TOKEN_CHARS
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase());
        if canonical {
            Ok(Self(value))
        } else {
            Err(format!("not a canonical word token: {:?}", value))
        }
    }
}

impl From<WordToken> for String {
    fn from(token: WordToken) -> Self {
        token.0
    }
}

impl fmt::Display for WordToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One histogram entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordFreq {
    pub word: WordToken,
    pub frequency: u64,
}

/// Multiset of words with their frequencies
///
/// Equality is multiset equality: two histograms are equal when they hold the
/// same words with the same frequencies, in any entry order.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    items: Vec<WordFreq>,
}

impl Histogram {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of distinct words
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    /// Frequency of `word`, if present
    pub fn get(&self, word: &str) -> Option<u64> {
        self.items
            .iter()
            .find(|entry| entry.word.as_str() == word)
            .map(|entry| entry.frequency)
    }

    /// Sum of all frequencies
    pub fn total_words(&self) -> u64 {
        self.items.iter().map(|entry| entry.frequency).sum()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[WordFreq] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &WordFreq> {
        self.items.iter()
    }

    /// Count one occurrence of `word`
    pub fn add_word(&mut self, word: WordToken) -> CountResult<()> {
        self.add_count(word, 1)
    }

    /// Add `frequency` occurrences of `word` in one step
    ///
    /// Fails with [`WordCountError::FrequencyOverflow`] when the new total
    /// does not fit; the entry is left unchanged.
    pub fn add_count(&mut self, word: WordToken, frequency: u64) -> CountResult<()> {
        if frequency == 0 {
            return Ok(());
        }
        if let Some(entry) = self.items.iter_mut().find(|entry| entry.word == word) {
            entry.frequency = entry.frequency.checked_add(frequency).ok_or_else(|| {
                WordCountError::FrequencyOverflow {
                    word: word.as_str().to_string(),
                }
            })?;
            return Ok(());
        }
        self.ensure_capacity(self.items.len() + 1)?;
        self.items.push(WordFreq { word, frequency });
        Ok(())
    }

    /// Fold every entry of `source` into `self`
    ///
    /// Each source frequency is added once, so the cost is linear in the
    /// number of distinct source words (times the lookup scan). The result is
    /// independent of the order in which partial histograms are merged.
    pub fn merge(&mut self, source: &Histogram) -> CountResult<()> {
        for entry in &source.items {
            self.add_count(entry.word.clone(), entry.frequency)?;
        }
        Ok(())
    }

    /// Consume the histogram into entries sorted bytewise by word
    pub fn into_sorted(mut self) -> Vec<WordFreq> {
        self.sort_by_word();
        self.items
    }

    /// Sort entries ascending by the bytes of the word
    pub fn sort_by_word(&mut self) {
        // Keys are unique, so an unstable sort is deterministic.
        self.items
            .sort_unstable_by(|a, b| a.word.as_bytes().cmp(b.word.as_bytes()));
    }

    fn ensure_capacity(&mut self, min_capacity: usize) -> CountResult<()> {
        let capacity = self.items.capacity();
        if capacity >= min_capacity {
            return Ok(());
        }
        let new_capacity = (capacity * 2).max(INITIAL_CAPACITY).max(min_capacity);
        self.items
            .try_reserve_exact(new_capacity - self.items.len())
            .map_err(|_| WordCountError::ResourceExhaustion {
                what: "histogram",
                requested: new_capacity,
            })
    }
}

impl PartialEq for Histogram {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .items
                .iter()
                .all(|entry| other.get(entry.word.as_str()) == Some(entry.frequency))
    }
}

impl Eq for Histogram {}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> WordToken {
        WordToken::fold(s).unwrap()
    }

    fn hist(pairs: &[(&str, u64)]) -> Histogram {
        let mut h = Histogram::new();
        for &(w, f) in pairs {
            h.add_count(word(w), f).unwrap();
        }
        h
    }

    #[test]
    fn test_fold_lowercases_and_truncates() {
        assert_eq!(word("FoX").as_str(), "fox");
        assert_eq!(word("abc123").as_str(), "abc123");

        let long = "A".repeat(150);
        let folded = word(&long);
        assert_eq!(folded.as_str().len(), MAX_TOKEN_CHARS);
        assert!(folded.as_str().bytes().all(|b| b == b'a'));
    }

    #[test]
    fn test_fold_rejects_separators() {
        assert!(WordToken::fold("").is_none());
        assert!(WordToken::fold("two words").is_none());
        assert!(WordToken::fold("fox.").is_none());
    }

    #[test]
    fn test_try_from_requires_canonical_form() {
        assert!(WordToken::try_from("fox".to_string()).is_ok());
        assert!(WordToken::try_from("Fox".to_string()).is_err());
        assert!(WordToken::try_from(String::new()).is_err());
        assert!(WordToken::try_from("a".repeat(MAX_TOKEN_CHARS + 1)).is_err());
    }

    #[test]
    fn test_add_word_increments_existing_entry() {
        let mut h = Histogram::new();
        h.add_word(word("the")).unwrap();
        h.add_word(word("fox")).unwrap();
        h.add_word(word("the")).unwrap();

        assert_eq!(h.len(), 2);
        assert_eq!(h.get("the"), Some(2));
        assert_eq!(h.get("fox"), Some(1));
        assert_eq!(h.get("dog"), None);
        assert_eq!(h.total_words(), 3);
    }

    #[test]
    fn test_capacity_doubles_from_initial() {
        let mut h = Histogram::new();
        h.add_word(word("w0")).unwrap();
        assert!(h.capacity() >= INITIAL_CAPACITY);

        for i in 1..=INITIAL_CAPACITY {
            h.add_word(word(&format!("w{}", i))).unwrap();
        }
        assert_eq!(h.len(), INITIAL_CAPACITY + 1);
        assert!(h.capacity() >= INITIAL_CAPACITY * 2);
    }

    #[test]
    fn test_add_count_overflow_is_an_error() {
        let mut h = hist(&[("x", u64::MAX)]);
        let err = h.add_count(word("x"), 2).unwrap_err();
        assert!(matches!(err, WordCountError::FrequencyOverflow { ref word } if word == "x"));
        assert_eq!(h.get("x"), Some(u64::MAX));

        let mut dest = hist(&[("x", 1)]);
        assert!(dest.merge(&hist(&[("x", u64::MAX)])).is_err());
    }

    #[test]
    fn test_merge_adds_frequencies_directly() {
        let mut dest = hist(&[("the", 2), ("fox", 1)]);
        let source = hist(&[("fox", 4), ("runs", 3)]);

        dest.merge(&source).unwrap();

        assert_eq!(dest, hist(&[("the", 2), ("fox", 5), ("runs", 3)]));
        assert_eq!(dest.total_words(), 10);
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        let a = hist(&[("alpha", 1), ("beta", 2)]);
        let b = hist(&[("beta", 5), ("gamma", 1)]);
        let c = hist(&[("alpha", 7), ("delta", 2), ("gamma", 3)]);

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_eq!(ab, ba);

        let mut ab_c = ab.clone();
        ab_c.merge(&c).unwrap();

        let mut bc = b.clone();
        bc.merge(&c).unwrap();
        let mut a_bc = a.clone();
        a_bc.merge(&bc).unwrap();

        assert_eq!(ab_c, a_bc);
        assert_eq!(ab_c.total_words(), a.total_words() + b.total_words() + c.total_words());
    }

    #[test]
    fn test_merge_matches_repeated_single_increments() {
        let source = hist(&[("x", 3), ("y", 1), ("z", 4)]);

        let mut direct = hist(&[("y", 2)]);
        direct.merge(&source).unwrap();

        let mut incremental = hist(&[("y", 2)]);
        for entry in source.iter() {
            for _ in 0..entry.frequency {
                incremental.add_word(entry.word.clone()).unwrap();
            }
        }

        assert_eq!(direct, incremental);
    }

    #[test]
    fn test_merge_empty_is_identity() {
        let base = hist(&[("one", 1)]);
        let mut merged = base.clone();
        merged.merge(&Histogram::new()).unwrap();
        assert_eq!(merged, base);

        let mut empty = Histogram::new();
        empty.merge(&base).unwrap();
        assert_eq!(empty, base);
    }

    #[test]
    fn test_into_sorted_is_bytewise() {
        let h = hist(&[("zebra", 1), ("10", 2), ("apple", 3), ("9", 1), ("ab", 1)]);
        let words: Vec<String> = h
            .into_sorted()
            .into_iter()
            .map(|e| e.word.to_string())
            .collect();
        assert_eq!(words, vec!["10", "9", "ab", "apple", "zebra"]);
    }

    #[test]
    fn test_equality_ignores_entry_order() {
        assert_eq!(hist(&[("a", 1), ("b", 2)]), hist(&[("b", 2), ("a", 1)]));
        assert_ne!(hist(&[("a", 1), ("b", 2)]), hist(&[("a", 1), ("b", 3)]));
        assert_ne!(hist(&[("a", 1)]), hist(&[("a", 1), ("b", 1)]));
    }
}
