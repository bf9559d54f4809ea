//! # Account State Store
//!
//! The key-value contract the registration flows persist through, plus two
//! implementations.
//!
//! ```text
//! keys.rs    - well-known key names and the identity reset list
//! db.rs      - sled-backed store, one `account` tree, bincode values
//! memory.rs  - in-memory store with an operation log (tests, tooling)
//! ```
//!
//! ## Contract
//!
//! Every `put` and `remove` is durable once it returns. There is no batching
//! across keys: a crash may leave any prefix of a sequence of writes on
//! disk. Callers order their writes accordingly (see `registration::secrets`).

pub mod db;
pub mod keys;
pub mod memory;

pub use db::SledAccountStore;
pub use memory::{MemoryAccountStore, StoreOp};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{DerivationError, IdentityKeyPair, KeyError, Seed};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to an account store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A value held under one store key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreValue {
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    KeyPair(StoredIdentityKeyPair),
}

impl StoreValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoreValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StoreValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_key_pair(&self) -> Option<&StoredIdentityKeyPair> {
        match self {
            StoreValue::KeyPair(kp) => Some(kp),
            _ => None,
        }
    }
}

impl fmt::Debug for StoreValue {
    // Text values include the password and the recovery phrase.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreValue::Bool(b) => write!(f, "Bool({})", b),
            StoreValue::Text(s) => write!(f, "Text(<{} bytes>)", s.len()),
            StoreValue::Bytes(b) => write!(f, "Bytes(<{} bytes>)", b.len()),
            StoreValue::KeyPair(kp) => write!(f, "KeyPair(pub={})", hex::encode(&kp.pub_key)),
        }
    }
}

/// The persisted form of an [`IdentityKeyPair`].
///
/// Field layout mirrors what other readers of the store expect: the
/// versioned X25519 public key, the X25519 secret, and the Ed25519 pair in
/// its 32-byte public / 64-byte `seed || public` form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StoredIdentityKeyPair {
    pub pub_key: Vec<u8>,
    pub priv_key: Vec<u8>,
    pub ed25519_public: Vec<u8>,
    pub ed25519_secret: Vec<u8>,
}

impl StoredIdentityKeyPair {
    /// Rebuild the identity from the stored Ed25519 seed and check it
    /// matches the stored public halves.
    pub fn to_identity(&self) -> Result<IdentityKeyPair, DerivationError> {
        let seed_bytes: [u8; 32] = self
            .ed25519_secret
            .get(..32)
            .and_then(|s| s.try_into().ok())
            .ok_or(KeyError::InvalidSecretKey)?;
        let identity = IdentityKeyPair::from_seed(&Seed::from_bytes(seed_bytes))?;
        if identity.versioned_public_key().as_slice() != self.pub_key.as_slice()
            || identity.ed25519().public_key_bytes().as_slice() != self.ed25519_public.as_slice()
        {
            return Err(KeyError::KeypairMismatch.into());
        }
        Ok(identity)
    }
}

impl From<&IdentityKeyPair> for StoredIdentityKeyPair {
    fn from(identity: &IdentityKeyPair) -> Self {
        Self {
            pub_key: identity.versioned_public_key().to_vec(),
            priv_key: identity.x25519().secret_key_bytes().to_vec(),
            ed25519_public: identity.ed25519().public_key_bytes().to_vec(),
            ed25519_secret: identity.ed25519().keypair_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for StoredIdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoredIdentityKeyPair(pub={})", hex::encode(&self.pub_key))
    }
}

// ---------------------------------------------------------------------------
// AccountStore
// ---------------------------------------------------------------------------

/// Asynchronous key-value persistence for account state.
///
/// Implementations must make each write durable before returning and give
/// last-write-wins semantics per key. Nothing more is assumed.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Value under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<StoreValue>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: StoreValue) -> StoreResult<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
