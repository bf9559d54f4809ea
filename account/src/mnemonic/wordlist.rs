//! Word lists for recovery phrases.
//!
//! Each list is loaded once from the text file embedded at compile time and
//! indexed by its unique prefix, so that `"abbey"`, `"abbeys"` and `"abb"`
//! all resolve to the same index. Phrases typed from memory tend to drift
//! past the prefix, and the prefix is all the codec ever looks at.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::MNEMONIC_PREFIX_LENGTH;

/// An ordered word list with a prefix index.
#[derive(Debug)]
pub struct Wordlist {
    words: Vec<&'static str>,
    prefix_len: usize,
    by_prefix: HashMap<&'static str, usize>,
}

impl Wordlist {
    fn from_text(text: &'static str, prefix_len: usize) -> Self {
        let words: Vec<&'static str> = text
            .lines()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .collect();
        let by_prefix = words
            .iter()
            .enumerate()
            .map(|(i, w)| (prefix(w, prefix_len), i))
            .collect();
        Self {
            words,
            prefix_len,
            by_prefix,
        }
    }

    /// The English list: 1626 words, unique on their first three letters.
    pub fn english() -> &'static Wordlist {
        static ENGLISH: OnceLock<Wordlist> = OnceLock::new();
        ENGLISH.get_or_init(|| Self::from_text(include_str!("english.txt"), MNEMONIC_PREFIX_LENGTH))
    }

    /// Number of words in the list.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Characters that identify a word.
    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Word at `index`, if in range.
    pub fn word(&self, index: usize) -> Option<&'static str> {
        self.words.get(index).copied()
    }

    /// Index of the list word sharing `word`'s prefix.
    pub fn position(&self, word: &str) -> Option<usize> {
        self.by_prefix.get(prefix(word, self.prefix_len)).copied()
    }

    /// The unique prefix of `word` under this list's rules.
    pub fn prefix_of<'a>(&self, word: &'a str) -> &'a str {
        prefix(word, self.prefix_len)
    }
}

/// First `len` characters of `word` (or the whole word if shorter).
fn prefix(word: &str, len: usize) -> &str {
    match word.char_indices().nth(len) {
        Some((idx, _)) => &word[..idx],
        None => word,
    }
}
