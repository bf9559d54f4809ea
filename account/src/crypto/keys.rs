//! # Key Management
//!
//! Ed25519 signing keys and their X25519 twins.
//!
//! Every account owns exactly one Ed25519 keypair. Its X25519 keypair is not
//! generated separately: it is *converted* from the Ed25519 one, the same way
//! libsodium's `crypto_sign_ed25519_{pk,sk}_to_curve25519` do it. Both halves
//! therefore come out of one seed, and relinking a device can rebuild both
//! from the recovery phrase alone.
//!
//! ## Security considerations
//!
//! - Secret material is zeroized on drop (ed25519-dalek and x25519-dalek
//!   take care of their own types; intermediate buffers are wiped here).
//! - Key bytes are never logged, and `Debug` only ever shows public halves.

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH};
use sha2::{Digest, Sha512};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, Zeroizing};

use crate::config::{PUBLIC_KEY_LENGTH, VERSIONED_PUBLIC_KEY_LENGTH, X25519_VERSION_BYTE};

/// Errors that can occur during key operations. Messages never include key
/// material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes")]
    InvalidSecretKey,

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("keypair validation failed: public key does not match secret key")]
    KeypairMismatch,
}

// ---------------------------------------------------------------------------
// SigningKeyPair
// ---------------------------------------------------------------------------

/// An account's Ed25519 keypair.
///
/// Not `Serialize`. Stores persist a `StoredIdentityKeyPair` instead.
pub struct SigningKeyPair {
    signing_key: SigningKey,
}

impl SigningKeyPair {
    /// Constructs a keypair deterministically from a 32-byte seed.
    ///
    /// Same seed, same keypair, on every platform. Device linking depends on
    /// that.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Raw 32-byte Ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Hex-encoded Ed25519 public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// The 32-byte seed this keypair was built from.
    ///
    /// **Handle with extreme care.** Whoever holds these bytes holds the
    /// account.
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; SECRET_KEY_LENGTH]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }

    /// The 64-byte `seed || public` form used by libsodium-style stores.
    pub fn keypair_bytes(&self) -> Zeroizing<[u8; 64]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.signing_key
            .verifying_key()
            .verify(message, signature)
            .is_ok()
    }

    /// Convert to the X25519 keypair used for key agreement.
    ///
    /// - public: the Edwards point mapped to its Montgomery u-coordinate.
    /// - secret: the first half of `SHA-512(seed)`, clamped.
    pub fn to_x25519(&self) -> Result<X25519KeyPair, KeyError> {
        let point = CompressedEdwardsY(self.public_key_bytes())
            .decompress()
            .ok_or(KeyError::InvalidPublicKey)?;
        let public = point.to_montgomery().to_bytes();

        let seed = self.secret_key_bytes();
        let mut hash = Sha512::digest(seed.as_slice());
        let mut scalar = Zeroizing::new([0u8; 32]);
        scalar.copy_from_slice(&hash[..32]);
        hash.as_mut_slice().zeroize();

        scalar[0] &= 248;
        scalar[31] &= 127;
        scalar[31] |= 64;

        let secret = StaticSecret::from(*scalar);
        if X25519PublicKey::from(&secret).to_bytes() != public {
            return Err(KeyError::KeypairMismatch);
        }
        Ok(X25519KeyPair { secret, public })
    }
}

impl Clone for SigningKeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKeyPair(pub={})", self.public_key_hex())
    }
}

impl PartialEq for SigningKeyPair {
    /// Compares public keys only.
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes() == other.public_key_bytes()
    }
}

impl Eq for SigningKeyPair {}

// ---------------------------------------------------------------------------
// X25519KeyPair
// ---------------------------------------------------------------------------

/// X25519 keypair converted from a [`SigningKeyPair`].
#[derive(Clone)]
pub struct X25519KeyPair {
    secret: StaticSecret,
    public: [u8; PUBLIC_KEY_LENGTH],
}

impl X25519KeyPair {
    /// Raw 32-byte X25519 public key.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.public
    }

    /// The version-tagged public key: `[0x05] || public`.
    pub fn versioned_public_key(&self) -> [u8; VERSIONED_PUBLIC_KEY_LENGTH] {
        let mut out = [0u8; VERSIONED_PUBLIC_KEY_LENGTH];
        out[0] = X25519_VERSION_BYTE;
        out[1..].copy_from_slice(&self.public);
        out
    }

    /// Clamped 32-byte X25519 secret scalar.
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// Diffie-Hellman with a peer's raw X25519 public key.
    pub fn shared_secret(&self, their_public: &[u8; PUBLIC_KEY_LENGTH]) -> Zeroizing<[u8; 32]> {
        let shared = self
            .secret
            .diffie_hellman(&X25519PublicKey::from(*their_public));
        Zeroizing::new(shared.to_bytes())
    }
}

impl fmt::Debug for X25519KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519KeyPair(pub={})", hex::encode(self.public))
    }
}

impl PartialEq for X25519KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}

impl Eq for X25519KeyPair {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = SigningKeyPair::from_seed(&seed);
        let kp2 = SigningKeyPair::from_seed(&seed);
        assert_eq!(kp1, kp2);
        assert_eq!(kp1.to_x25519().unwrap(), kp2.to_x25519().unwrap());
    }

    #[test]
    fn rfc8032_test_vector_1() {
        let seed: [u8; 32] =
            hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
                .unwrap()
                .try_into()
                .unwrap();
        let kp = SigningKeyPair::from_seed(&seed);
        assert_eq!(
            kp.public_key_hex(),
            "d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a"
        );
    }

    #[test]
    fn rfc8032_vector_1_converts_like_libsodium() {
        // crypto_sign_ed25519_pk_to_curve25519 / _sk_to_curve25519 outputs.
        let seed: [u8; 32] =
            hex::decode("9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60")
                .unwrap()
                .try_into()
                .unwrap();
        let x = SigningKeyPair::from_seed(&seed).to_x25519().unwrap();
        assert_eq!(
            hex::encode(x.public_key_bytes()),
            "d85e07ec22b0ad881537c2f44d662d1a143cf830c57aca4305d85c7a90f6b62e"
        );
        assert_eq!(
            hex::encode(*x.secret_key_bytes()),
            "307c83864f2833cb427a2ef1c00a013cfdff2768d980c0a3a520f006904de94f"
        );
    }

    #[test]
    fn sign_verify_roundtrip() {
        let kp = SigningKeyPair::from_seed(&[7u8; 32]);
        let sig = kp.sign(b"hello");
        assert!(kp.verify(b"hello", &sig));
        assert!(!kp.verify(b"goodbye", &sig));
    }

    #[test]
    fn x25519_secret_matches_converted_public() {
        let kp = SigningKeyPair::from_seed(&[1u8; 32]);
        let x = kp.to_x25519().unwrap();
        let from_secret = X25519PublicKey::from(&StaticSecret::from(*x.secret_key_bytes()));
        assert_eq!(from_secret.to_bytes(), x.public_key_bytes());
    }

    #[test]
    fn x25519_secret_is_clamped() {
        let x = SigningKeyPair::from_seed(&[9u8; 32]).to_x25519().unwrap();
        let s = x.secret_key_bytes();
        assert_eq!(s[0] & 7, 0);
        assert_eq!(s[31] & 128, 0);
        assert_eq!(s[31] & 64, 64);
    }

    #[test]
    fn converted_keys_agree_on_shared_secret() {
        let alice = SigningKeyPair::from_seed(&[2u8; 32]).to_x25519().unwrap();
        let bob = SigningKeyPair::from_seed(&[3u8; 32]).to_x25519().unwrap();
        assert_eq!(
            *alice.shared_secret(&bob.public_key_bytes()),
            *bob.shared_secret(&alice.public_key_bytes())
        );
    }

    #[test]
    fn versioned_key_layout() {
        let x = SigningKeyPair::from_seed(&[5u8; 32]).to_x25519().unwrap();
        let v = x.versioned_public_key();
        assert_eq!(v.len(), 33);
        assert_eq!(v[0], 5);
        assert_eq!(&v[1..], &x.public_key_bytes());
    }

    #[test]
    fn keypair_bytes_are_seed_then_public() {
        let kp = SigningKeyPair::from_seed(&[4u8; 32]);
        let bytes = kp.keypair_bytes();
        assert_eq!(&bytes[..32], &[4u8; 32]);
        assert_eq!(&bytes[32..], &kp.public_key_bytes());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = SigningKeyPair::from_seed(&[8u8; 32]);
        let dbg = format!("{:?} {:?}", kp, kp.to_x25519().unwrap());
        assert!(dbg.starts_with("SigningKeyPair(pub="));
        assert!(!dbg.contains(&hex::encode([8u8; 32])));
    }
}
