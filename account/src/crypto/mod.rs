//! # Cryptographic Primitives
//!
//! Everything that touches key material lives under here:
//!
//! - **Ed25519** for the account's signing key.
//! - **X25519** for key agreement, converted from the Ed25519 key.
//! - **SHA-512** for the secret-key conversion.
//!
//! All of it is a thin, typed layer over the dalek crates. No hand-rolled
//! curve arithmetic.

pub mod derivation;
pub mod keys;

pub use derivation::{derive_identity, pad_seed_hex, DerivationError, IdentityKeyPair, Seed};
pub use keys::{KeyError, SigningKeyPair, X25519KeyPair};
