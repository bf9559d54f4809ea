//! # Multi-Device Sync Seams
//!
//! The pieces of registration that talk to the rest of the world, kept
//! behind traits:
//!
//! ```text
//! cancel.rs   - cancellation token for the link-time profile poll
//! profile.rs  - ProfilePoller / ProfileSource: find our display name remotely
//! mod.rs      - ConfigSync: bring up multi-device config state after activation
//! ```

pub mod cancel;
pub mod profile;

pub use cancel::{link_cancellation, LinkCancelHandle, LinkCancellation};
pub use profile::{ConfigMessageFile, PollError, ProfilePoller, ProfileSource, SwarmProfilePoller};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::identity::AccountPublicId;
use crate::storage::{keys, AccountStore, StoreError, StoreValue};

/// Errors from config sync initialization.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("config sync needs the primary device key to be stored first")]
    MissingIdentity,

    #[error("stored primary device key does not match the account being activated")]
    IdentityMismatch,

    #[error("account store error: {0}")]
    Store(#[from] StoreError),

    #[error("config sync unavailable: {0}")]
    Unavailable(String),
}

/// Brings up multi-device configuration state for an account.
#[async_trait]
pub trait ConfigSync: Send + Sync {
    async fn initialize(&self, account_id: &AccountPublicId) -> Result<(), SyncError>;
}

/// Local config sync bootstrap.
///
/// Checks that the primary device key has been persisted for this very
/// account (the sync state is keyed by it) and records that initialization
/// happened.
pub struct StoreBackedConfigSync {
    store: Arc<dyn AccountStore>,
}

impl StoreBackedConfigSync {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ConfigSync for StoreBackedConfigSync {
    async fn initialize(&self, account_id: &AccountPublicId) -> Result<(), SyncError> {
        let primary = self
            .store
            .get(keys::PRIMARY_DEVICE_PUB_KEY)
            .await?
            .ok_or(SyncError::MissingIdentity)?;
        if primary.as_text() != Some(account_id.as_str()) {
            return Err(SyncError::IdentityMismatch);
        }
        self.store
            .put(keys::CONFIG_SYNC_INITIALIZED, StoreValue::Bool(true))
            .await?;
        tracing::debug!(account_id = %account_id, "config sync initialized");
        Ok(())
    }
}
