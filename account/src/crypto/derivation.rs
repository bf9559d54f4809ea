//! # Identity Derivation
//!
//! Seed in, identity out. No I/O, no randomness, no clock.
//!
//! ```text
//! seed hex --pad/truncate to 64--> 32-byte seed --> Ed25519 keypair
//!                                                        |
//!                                            convert     v
//!                                   [0x05] || X25519 public  ==  account id
//! ```
//!
//! ## Seed padding
//!
//! Phrases generated by current clients decode to 16 bytes (32 hex chars),
//! while Ed25519 wants 32 bytes. Short seeds are right-padded with `'0'`
//! characters and cut to exactly 64 hex characters before being turned into
//! bytes. The padding adds no entropy. It exists so that every identity ever
//! created from a short phrase keeps deriving to the same account id, and it
//! must stay byte-for-byte what it is.

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::keys::{KeyError, SigningKeyPair, X25519KeyPair};
use crate::config::{DERIVATION_SEED_HEX_LENGTH, DERIVATION_SEED_LENGTH, VERSIONED_PUBLIC_KEY_LENGTH};
use crate::identity::AccountPublicId;

/// Errors from turning a seed into an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("seed is not valid hex")]
    InvalidSeedHex,

    #[error(transparent)]
    Key(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// A 32-byte derivation seed. Wiped from memory on drop and never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; DERIVATION_SEED_LENGTH]);

impl Seed {
    /// Parse a (possibly short) hex seed, applying the legacy padding rule.
    pub fn from_hex(seed_hex: &str) -> Result<Self, DerivationError> {
        let padded = pad_seed_hex(seed_hex)?;
        let mut bytes = [0u8; DERIVATION_SEED_LENGTH];
        hex::decode_to_slice(padded.as_bytes(), &mut bytes)
            .map_err(|_| DerivationError::InvalidSeedHex)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; DERIVATION_SEED_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DERIVATION_SEED_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Right-pad `seed_hex` with `'0'` and truncate to exactly 64 characters.
///
/// Seeds that are already 64 characters long come back unchanged. `"aa"`
/// becomes `"aa"` followed by 62 zeros.
pub fn pad_seed_hex(seed_hex: &str) -> Result<Zeroizing<String>, DerivationError> {
    if !seed_hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DerivationError::InvalidSeedHex);
    }

    let mut padded = Zeroizing::new(String::with_capacity(
        seed_hex.len().max(DERIVATION_SEED_HEX_LENGTH),
    ));
    padded.push_str(seed_hex);
    if padded.len() != DERIVATION_SEED_HEX_LENGTH {
        while padded.len() < DERIVATION_SEED_HEX_LENGTH {
            padded.push('0');
        }
        padded.truncate(DERIVATION_SEED_HEX_LENGTH);
    }
    Ok(padded)
}

// ---------------------------------------------------------------------------
// IdentityKeyPair
// ---------------------------------------------------------------------------

/// The complete key material of one account: an Ed25519 keypair and the
/// X25519 keypair converted from it.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityKeyPair {
    ed25519: SigningKeyPair,
    x25519: X25519KeyPair,
}

impl IdentityKeyPair {
    /// Derive the identity for `seed`.
    pub fn from_seed(seed: &Seed) -> Result<Self, DerivationError> {
        let ed25519 = SigningKeyPair::from_seed(seed.as_bytes());
        let x25519 = ed25519.to_x25519()?;
        Ok(Self { ed25519, x25519 })
    }

    pub fn ed25519(&self) -> &SigningKeyPair {
        &self.ed25519
    }

    pub fn x25519(&self) -> &X25519KeyPair {
        &self.x25519
    }

    /// `[0x05] || x25519_public`, 33 bytes.
    pub fn versioned_public_key(&self) -> [u8; VERSIONED_PUBLIC_KEY_LENGTH] {
        self.x25519.versioned_public_key()
    }

    /// The account's public identifier (hex of the versioned key).
    pub fn account_id(&self) -> AccountPublicId {
        AccountPublicId::from_versioned_key(&self.versioned_public_key())
    }
}

impl std::fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IdentityKeyPair({})", self.account_id())
    }
}

/// Derive an identity from a hex seed (short seeds are padded first).
pub fn derive_identity(seed_hex: &str) -> Result<IdentityKeyPair, DerivationError> {
    let seed = Seed::from_hex(seed_hex)?;
    IdentityKeyPair::from_seed(&seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        for byte in [0u8, 1, 0x7f, 0xff] {
            let seed = Seed::from_bytes([byte; 32]);
            let a = IdentityKeyPair::from_seed(&seed).unwrap();
            let b = IdentityKeyPair::from_seed(&seed).unwrap();
            assert_eq!(a.versioned_public_key(), b.versioned_public_key());
            assert_eq!(
                *a.x25519().secret_key_bytes(),
                *b.x25519().secret_key_bytes()
            );
            assert_eq!(a.ed25519().public_key_bytes(), b.ed25519().public_key_bytes());
        }
    }

    #[test]
    fn known_seed_derives_known_account() {
        // libsodium crypto_sign_seed_keypair over the zero-padded seed, then
        // the ed25519-to-curve25519 conversions.
        let identity = derive_identity("00112233445566778899aabbccddeeff").unwrap();
        assert_eq!(
            identity.ed25519().public_key_hex(),
            "5ea34e72bb044654a6a23675690ef5ffaaf1656b02f93fb76655f9cbdbe89876"
        );
        assert_eq!(
            identity.account_id().as_str(),
            "05aa654f00fc39fc69fd0db829410ca38177d7732a8d2f0934ab3872ac56d5aa74"
        );
        assert_eq!(
            hex::encode(*identity.x25519().secret_key_bytes()),
            "608744d00cd35a82177fe30a1befc3ec3282a9484df0deb13cc5842c0145d455"
        );
    }

    #[test]
    fn short_seed_pads_with_zeros() {
        let padded = pad_seed_hex("aa").unwrap();
        assert_eq!(padded.as_str(), format!("aa{}", "0".repeat(62)));

        let short = derive_identity("aa").unwrap();
        let explicit = derive_identity(&format!("aa{}", "0".repeat(62))).unwrap();
        assert_eq!(short, explicit);
        assert_eq!(short.account_id(), explicit.account_id());
    }

    #[test]
    fn sixteen_byte_seed_pads_to_thirty_two() {
        let seed16 = "0123456789abcdef0123456789abcdef";
        let padded = pad_seed_hex(seed16).unwrap();
        assert_eq!(padded.as_str(), format!("{}{}", seed16, "0".repeat(32)));
    }

    #[test]
    fn full_and_long_seeds_are_truncated_not_padded() {
        let full = "ab".repeat(32);
        assert_eq!(pad_seed_hex(&full).unwrap().as_str(), full);

        let long = format!("{}ffff", full);
        assert_eq!(pad_seed_hex(&long).unwrap().as_str(), full);
    }

    #[test]
    fn non_hex_seed_is_rejected() {
        assert_eq!(
            derive_identity("not hex").unwrap_err(),
            DerivationError::InvalidSeedHex
        );
        assert_eq!(
            pad_seed_hex("ééé").unwrap_err(),
            DerivationError::InvalidSeedHex
        );
    }

    #[test]
    fn versioned_key_starts_with_five() {
        for byte in 0u8..16 {
            let id = IdentityKeyPair::from_seed(&Seed::from_bytes([byte; 32])).unwrap();
            let key = id.versioned_public_key();
            assert_eq!(key.len(), 33);
            assert_eq!(key[0], 5);
            assert!(id.account_id().as_str().starts_with("05"));
            assert_eq!(id.account_id().as_str().len(), 66);
        }
    }

    #[test]
    fn x25519_half_comes_from_ed25519_half() {
        let id = derive_identity("42").unwrap();
        let again = id.ed25519().to_x25519().unwrap();
        assert_eq!(&again, id.x25519());
    }

    #[test]
    fn debug_shows_account_id_only() {
        let id = derive_identity("aa").unwrap();
        let dbg = format!("{:?}", id);
        assert!(dbg.contains(id.account_id().as_str()));
        let seed = Seed::from_hex("aa").unwrap();
        assert_eq!(format!("{:?}", seed), "Seed(..)");
    }
}
