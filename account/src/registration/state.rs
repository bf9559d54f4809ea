//! Registration state, as read back from the account store.
//!
//! Nothing here is cached: the store is the single source of truth, and the
//! state is recomputed from it on every call.
//!
//! | State            | Condition                                                   |
//! |------------------|-------------------------------------------------------------|
//! | `Registered`     | `chromiumRegistrationDone` present                          |
//! | `PendingLinking` | linking flag set and a complete identity stored             |
//! | `Unregistered`   | anything else, including a half-written identity            |
//!
//! An identity is complete once `identityKey` and `number_id` are both
//! present. `number_id` is always written last, so a crash in the middle of
//! creating an identity reads back as `Unregistered`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::AccountPublicId;
use crate::storage::{keys, AccountStore, StoreResult, StoreValue};

/// Where this install is in the registration lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationState {
    Unregistered,
    /// Identity created by a device link, waiting for the profile.
    PendingLinking,
    Registered,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationState::Unregistered => "unregistered",
            RegistrationState::PendingLinking => "pending-linking",
            RegistrationState::Registered => "registered",
        };
        f.write_str(s)
    }
}

/// Compute the current state from the store.
pub async fn load_registration_state(store: &dyn AccountStore) -> StoreResult<RegistrationState> {
    if is_registration_done(store).await? {
        return Ok(RegistrationState::Registered);
    }

    let linking = store
        .get(keys::SIGN_IN_BY_LINKING)
        .await?
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if linking && has_complete_identity(store).await? {
        return Ok(RegistrationState::PendingLinking);
    }

    Ok(RegistrationState::Unregistered)
}

/// Whether `identityKey` and `number_id` are both stored.
pub async fn has_complete_identity(store: &dyn AccountStore) -> StoreResult<bool> {
    Ok(store.get(keys::IDENTITY_KEY).await?.is_some()
        && store.get(keys::NUMBER_ID).await?.is_some())
}

/// The account id stored under `number_id`, if any.
pub async fn load_account_id(store: &dyn AccountStore) -> StoreResult<Option<AccountPublicId>> {
    let Some(value) = store.get(keys::NUMBER_ID).await? else {
        return Ok(None);
    };
    let Some(device_id) = value.as_text() else {
        tracing::warn!("number_id holds a non-text value; ignoring");
        return Ok(None);
    };
    match AccountPublicId::from_device_id(device_id) {
        Ok(id) => Ok(Some(id)),
        Err(e) => {
            tracing::warn!(error = %e, "number_id is not a valid account id; ignoring");
            Ok(None)
        }
    }
}

pub async fn is_registration_done(store: &dyn AccountStore) -> StoreResult<bool> {
    Ok(store.get(keys::REGISTRATION_DONE).await?.is_some())
}

/// Durably mark this install as registered.
///
/// The `REGISTRATION_DONE` write is the commitment; everything before it
/// can be redone safely.
pub async fn mark_registration_done(store: &dyn AccountStore) -> StoreResult<()> {
    store
        .put(keys::REGISTRATION_DONE_EVER, StoreValue::Bool(true))
        .await?;
    store
        .put(keys::REGISTRATION_DONE, StoreValue::Bool(true))
        .await
}
