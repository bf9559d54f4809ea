//! # Account Configuration & Constants
//!
//! Every magic number in the account core lives here. Several of these are
//! frozen by identities that already exist in the wild: change the version
//! byte or the mnemonic prefix length and every recovery phrase ever written
//! down stops producing the same account.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity Keys
// ---------------------------------------------------------------------------

/// Version tag prepended to the X25519 public key. Account ids start with
/// `05` because of this byte.
pub const X25519_VERSION_BYTE: u8 = 0x05;

/// Raw X25519 / Ed25519 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Versioned X25519 public key: one version byte plus the raw key.
pub const VERSIONED_PUBLIC_KEY_LENGTH: usize = PUBLIC_KEY_LENGTH + 1;

/// Hex length of an account id (33 bytes).
pub const ACCOUNT_ID_HEX_LENGTH: usize = VERSIONED_PUBLIC_KEY_LENGTH * 2;

/// Ed25519 seed length fed to the key derivation engine.
pub const DERIVATION_SEED_LENGTH: usize = 32;

/// Hex characters in a padded derivation seed.
pub const DERIVATION_SEED_HEX_LENGTH: usize = DERIVATION_SEED_LENGTH * 2;

// ---------------------------------------------------------------------------
// Mnemonic
// ---------------------------------------------------------------------------

/// Entropy behind a freshly generated recovery phrase. 16 bytes encode to
/// 12 data words plus one checksum word.
pub const SEED_ENTROPY_LENGTH: usize = 16;

/// Shortest phrase the decoder will look at.
pub const MNEMONIC_MIN_WORDS: usize = 12;

/// Number of leading characters that uniquely identify a word in the
/// English list.
pub const MNEMONIC_PREFIX_LENGTH: usize = 3;

// ---------------------------------------------------------------------------
// Local Secrets
// ---------------------------------------------------------------------------

/// Random bytes behind the local subsystem password.
pub const PASSWORD_ENTROPY_LENGTH: usize = 16;

/// Trailing base64 characters dropped from the encoded password (the `==`
/// padding of a 16-byte payload).
pub const PASSWORD_TRIM_CHARS: usize = 2;

/// Suffix appended to the account id when it is stored under `number_id`.
pub const DEVICE_ID_SUFFIX: &str = ".1";

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Maximum display name size in UTF-8 bytes, measured after trimming.
pub const MAX_NAME_LENGTH_BYTES: usize = 64;

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Capacity of the registration event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the link-completion channel. One message per link attempt,
/// so a handful is plenty.
pub const LINK_CHANNEL_CAPACITY: usize = 8;

// ---------------------------------------------------------------------------
// Default Settings
// ---------------------------------------------------------------------------

/// Settings flags written alongside a fresh identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDefaults {
    /// Send read receipts to contacts.
    pub read_receipts: bool,
    /// Send typing indicators to contacts.
    pub typing_indicators: bool,
    /// Prune old community messages.
    pub opengroup_pruning: bool,
}

impl Default for RegistrationDefaults {
    fn default() -> Self {
        Self {
            read_receipts: false,
            typing_indicators: false,
            opengroup_pruning: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_is_66_hex_chars() {
        assert_eq!(ACCOUNT_ID_HEX_LENGTH, 66);
    }

    #[test]
    fn defaults_are_privacy_first() {
        let d = RegistrationDefaults::default();
        assert!(!d.read_receipts);
        assert!(!d.typing_indicators);
        assert!(d.opengroup_pruning);
    }
}
