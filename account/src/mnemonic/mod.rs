//! # Recovery Phrases
//!
//! Reversible mapping between seed bytes and a human-writable word phrase.
//!
//! The scheme is the legacy Electrum/Monero one: every 4 bytes of seed turn
//! into three words, and one checksum word (picked by CRC-32 over the word
//! prefixes) is appended. A 16-byte seed therefore becomes 13 words.
//!
//! ```text
//! seed hex  --(u32 LE per 8 hex chars)-->  3 words per chunk  --+--> phrase
//!                                                               |
//!                           crc32(prefixes) % len  -> checksum -+
//! ```
//!
//! ## Compatibility
//!
//! Phrases produced here must decode to the same seed in every client that
//! ever generated one, so the arithmetic is frozen. In particular, decoding
//! keeps only the low 32 bits of each triple's value, exactly like the
//! clients that came before.

mod wordlist;

pub use wordlist::Wordlist;

use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::config::{MNEMONIC_MIN_WORDS, SEED_ENTROPY_LENGTH};

/// Errors produced by the phrase codec.
///
/// Word errors carry a position, never the word itself. A misspelt word is
/// still most of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MnemonicError {
    #[error("unsupported mnemonic language: {0}")]
    UnsupportedLanguage(String),

    #[error("recovery phrase is too short")]
    TooShort,

    #[error("recovery phrase has too few words")]
    TooFewWords,

    #[error("recovery phrase is missing its checksum word")]
    MissingChecksumWord,

    #[error("word {position} is not in the word list")]
    InvalidWord { position: usize },

    #[error("recovery phrase checksum does not match")]
    InvalidChecksum,

    #[error("seed must be hex in 8-character chunks")]
    InvalidSeedHex,

    #[error("entropy length must be a non-zero multiple of 4 bytes, got {0}")]
    InvalidEntropyLength(usize),
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Languages a phrase can be written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MnemonicLanguage {
    #[default]
    English,
}

impl MnemonicLanguage {
    /// Canonical lowercase name, as stored and passed around by callers.
    pub fn name(&self) -> &'static str {
        match self {
            MnemonicLanguage::English => "english",
        }
    }

    pub fn wordlist(&self) -> &'static Wordlist {
        match self {
            MnemonicLanguage::English => Wordlist::english(),
        }
    }

    /// Parse a language name. Case-insensitive.
    pub fn from_name(name: &str) -> Result<Self, MnemonicError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "english" => Ok(MnemonicLanguage::English),
            _ => Err(MnemonicError::UnsupportedLanguage(name.to_string())),
        }
    }
}

impl FromStr for MnemonicLanguage {
    type Err = MnemonicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for MnemonicLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Encode a hex seed as a phrase.
///
/// The hex length must be a non-zero multiple of 8 (whole 4-byte chunks).
pub fn encode(seed_hex: &str, language: MnemonicLanguage) -> Result<String, MnemonicError> {
    if seed_hex.is_empty() || seed_hex.len() % 8 != 0 {
        return Err(MnemonicError::InvalidSeedHex);
    }
    let bytes = Zeroizing::new(hex::decode(seed_hex).map_err(|_| MnemonicError::InvalidSeedHex)?);

    let list = language.wordlist();
    let n = list.len() as u64;

    let mut words: Zeroizing<Vec<String>> =
        Zeroizing::new(Vec::with_capacity(bytes.len() / 4 * 3 + 1));
    for chunk in bytes.chunks_exact(4) {
        let x = u64::from(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        let w1 = x % n;
        let w2 = (x / n + w1) % n;
        let w3 = (x / n / n + w2) % n;
        for idx in [w1, w2, w3] {
            let word = list
                .word(idx as usize)
                .ok_or(MnemonicError::InvalidSeedHex)?;
            words.push(word.to_string());
        }
    }

    let checksum = checksum_word(list, &words).ok_or(MnemonicError::InvalidSeedHex)?;
    words.push(checksum);
    Ok(words.join(" "))
}

/// Decode a phrase back to its hex seed.
///
/// Words are matched on their unique prefix, case-insensitively, and may be
/// separated by any whitespace.
pub fn decode(phrase: &str, language: MnemonicLanguage) -> Result<String, MnemonicError> {
    let list = language.wordlist();
    let n = list.len() as u64;

    let mut words: Zeroizing<Vec<String>> =
        Zeroizing::new(phrase.split_whitespace().map(str::to_lowercase).collect());

    if words.len() < MNEMONIC_MIN_WORDS {
        return Err(MnemonicError::TooShort);
    }
    match words.len() % 3 {
        2 => return Err(MnemonicError::TooFewWords),
        0 => return Err(MnemonicError::MissingChecksumWord),
        _ => {}
    }

    let given_checksum = Zeroizing::new(words.pop().ok_or(MnemonicError::TooShort)?);

    let mut out = String::with_capacity(words.len() / 3 * 8);
    for (chunk_idx, triple) in words.chunks_exact(3).enumerate() {
        let base = chunk_idx * 3;
        let lookup = |offset: usize| {
            list.position(&triple[offset])
                .map(|i| i as u64)
                .ok_or(MnemonicError::InvalidWord {
                    position: base + offset,
                })
        };
        let w1 = lookup(0)?;
        let w2 = lookup(1)?;
        let w3 = lookup(2)?;

        let x = w1 + n * ((n - w1 + w2) % n) + n * n * ((n - w2 + w3) % n);
        out.push_str(&hex::encode((x as u32).to_le_bytes()));
    }

    let expected = checksum_word(list, &words).ok_or(MnemonicError::InvalidChecksum)?;
    if list.prefix_of(&expected) != list.prefix_of(&given_checksum) {
        return Err(MnemonicError::InvalidChecksum);
    }

    Ok(out)
}

/// Generate a random phrase over `byte_len` bytes of OS entropy.
pub fn generate(byte_len: usize, language: MnemonicLanguage) -> Result<String, MnemonicError> {
    if byte_len == 0 || byte_len % 4 != 0 {
        return Err(MnemonicError::InvalidEntropyLength(byte_len));
    }
    let mut entropy = Zeroizing::new(vec![0u8; byte_len]);
    OsRng.fill_bytes(&mut entropy);
    let seed_hex = Zeroizing::new(hex::encode(&*entropy));
    encode(&seed_hex, language)
}

/// Generate a fresh 13-word English phrase for a brand-new account.
pub fn generate_mnemonic() -> Result<String, MnemonicError> {
    generate(SEED_ENTROPY_LENGTH, MnemonicLanguage::English)
}

/// The checksum word for a list of data words: one of the words itself,
/// chosen by CRC-32 over their concatenated prefixes.
fn checksum_word(list: &Wordlist, words: &[String]) -> Option<String> {
    if words.is_empty() {
        return None;
    }
    let prefixes: Zeroizing<String> = Zeroizing::new(
        words
            .iter()
            .map(|w| list.prefix_of(w))
            .collect::<Vec<_>>()
            .concat(),
    );
    let index = crc32fast::hash(prefixes.as_bytes()) as usize % words.len();
    words.get(index).cloned()
}
