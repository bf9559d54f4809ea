//! Account public identifiers.
//!
//! An account id is the lowercase hex of the version-tagged X25519 public
//! key: 66 characters, always starting with `05`. It names the account on
//! the network and keys its note-to-self conversation locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::{
    ACCOUNT_ID_HEX_LENGTH, DEVICE_ID_SUFFIX, PUBLIC_KEY_LENGTH, VERSIONED_PUBLIC_KEY_LENGTH,
    X25519_VERSION_BYTE,
};

/// Errors from parsing an account id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIdError {
    #[error("account id must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("account id is not valid hex")]
    InvalidHex,

    #[error("unsupported account id version byte {0:#04x}")]
    UnsupportedVersion(u8),
}

/// Hex-encoded, version-tagged X25519 public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountPublicId(String);

impl AccountPublicId {
    /// Build the id from a 33-byte versioned public key.
    pub fn from_versioned_key(key: &[u8; VERSIONED_PUBLIC_KEY_LENGTH]) -> Self {
        Self(hex::encode(key))
    }

    /// Parse and validate a hex account id. Uppercase input is normalized.
    pub fn parse(s: &str) -> Result<Self, AccountIdError> {
        let s = s.trim();
        if s.len() != ACCOUNT_ID_HEX_LENGTH {
            return Err(AccountIdError::InvalidLength {
                expected: ACCOUNT_ID_HEX_LENGTH,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|_| AccountIdError::InvalidHex)?;
        if bytes[0] != X25519_VERSION_BYTE {
            return Err(AccountIdError::UnsupportedVersion(bytes[0]));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Parse the `<id>.1` form stored under `number_id`.
    pub fn from_device_id(device_id: &str) -> Result<Self, AccountIdError> {
        let id = device_id.strip_suffix(DEVICE_ID_SUFFIX).unwrap_or(device_id);
        Self::parse(id)
    }

    /// The `<id>.1` form stored under `number_id`.
    pub fn device_id(&self) -> String {
        format!("{}{}", self.0, DEVICE_ID_SUFFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw X25519 public key behind the id (version byte stripped).
    pub fn x25519_public_key(&self) -> Option<[u8; PUBLIC_KEY_LENGTH]> {
        let bytes = hex::decode(&self.0).ok()?;
        bytes.get(1..)?.try_into().ok()
    }
}

impl fmt::Display for AccountPublicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountPublicId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
