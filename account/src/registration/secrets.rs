//! Account secrets: reset the local identity, then write a new one.
//!
//! Write order matters. `number_id` goes last, so anything that reads the
//! store mid-way sees no account id and treats the install as unregistered.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::try_join_all;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::{RegistrationDefaults, PASSWORD_ENTROPY_LENGTH, PASSWORD_TRIM_CHARS};
use crate::crypto::IdentityKeyPair;
use crate::identity::AccountPublicId;
use crate::storage::{keys, AccountStore, StoreResult, StoreValue, StoredIdentityKeyPair};

/// Everything [`persist_secrets`] writes for a new account.
pub struct AccountSecrets {
    account_id: AccountPublicId,
    identity: StoredIdentityKeyPair,
    password: Zeroizing<String>,
    defaults: RegistrationDefaults,
}

impl AccountSecrets {
    /// Secrets for `identity`, with a freshly generated local password.
    pub fn new(identity: &IdentityKeyPair, defaults: RegistrationDefaults) -> Self {
        Self {
            account_id: identity.account_id(),
            identity: StoredIdentityKeyPair::from(identity),
            password: generate_local_password(),
            defaults,
        }
    }

    pub fn account_id(&self) -> &AccountPublicId {
        &self.account_id
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for AccountSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountSecrets")
            .field("account_id", &self.account_id)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Local database password: base64 of 16 random bytes, minus the `==`
/// padding.
pub fn generate_local_password() -> Zeroizing<String> {
    let mut bytes = Zeroizing::new([0u8; PASSWORD_ENTROPY_LENGTH]);
    OsRng.fill_bytes(bytes.as_mut());
    let mut encoded = Zeroizing::new(STANDARD.encode(bytes.as_ref()));
    let keep = encoded.len().saturating_sub(PASSWORD_TRIM_CHARS);
    encoded.truncate(keep);
    encoded
}

/// Remove every identity-bearing key, plus `extra`.
///
/// The removes run concurrently; all of them have finished when this
/// returns `Ok`.
pub async fn reset_identity(store: &dyn AccountStore, extra: &[&str]) -> StoreResult<()> {
    let removals = keys::IDENTITY_RESET_KEYS
        .iter()
        .chain(extra.iter())
        .map(|key| store.remove(key));
    try_join_all(removals).await?;
    debug!(extra = extra.len(), "local identity reset");
    Ok(())
}

/// Write the identity key, password and default settings, then the
/// account id.
pub async fn persist_secrets(store: &dyn AccountStore, secrets: &AccountSecrets) -> StoreResult<()> {
    store
        .put(keys::IDENTITY_KEY, StoreValue::KeyPair(secrets.identity.clone()))
        .await?;
    store
        .put(keys::PASSWORD, StoreValue::Text(secrets.password.to_string()))
        .await?;
    store
        .put(
            keys::SETTINGS_READ_RECEIPT,
            StoreValue::Bool(secrets.defaults.read_receipts),
        )
        .await?;
    store
        .put(
            keys::SETTINGS_TYPING_INDICATOR,
            StoreValue::Bool(secrets.defaults.typing_indicators),
        )
        .await?;
    store
        .put(
            keys::SETTINGS_OPENGROUP_PRUNING,
            StoreValue::Bool(secrets.defaults.opengroup_pruning),
        )
        .await?;

    set_local_pub_key(store, &secrets.account_id).await
}

/// Reset the local identity and write a new one derived from `identity`.
///
/// Not idempotent: a second call replaces the password and removes any
/// state the first call's caller wrote after it.
pub async fn create_account(
    store: &dyn AccountStore,
    identity: &IdentityKeyPair,
    defaults: RegistrationDefaults,
    extra_reset: &[&str],
) -> StoreResult<AccountSecrets> {
    reset_identity(store, extra_reset).await?;
    let secrets = AccountSecrets::new(identity, defaults);
    persist_secrets(store, &secrets).await?;
    info!(account_id = %secrets.account_id, "account secrets stored");
    Ok(secrets)
}

/// Store `<account_id>.1` as this device's number id.
pub async fn set_local_pub_key(store: &dyn AccountStore, account_id: &AccountPublicId) -> StoreResult<()> {
    store
        .put(keys::NUMBER_ID, StoreValue::Text(account_id.device_id()))
        .await
}

pub async fn save_recovery_phrase(store: &dyn AccountStore, phrase: &str) -> StoreResult<()> {
    store
        .put(keys::MNEMONIC, StoreValue::Text(phrase.to_string()))
        .await
}

pub async fn set_sign_in_by_linking(store: &dyn AccountStore, linking: bool) -> StoreResult<()> {
    store
        .put(keys::SIGN_IN_BY_LINKING, StoreValue::Bool(linking))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_identity;
    use crate::storage::{MemoryAccountStore, StoreOp};

    fn identity() -> IdentityKeyPair {
        derive_identity("0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn password_shape() {
        let a = generate_local_password();
        let b = generate_local_password();
        // 16 bytes -> 24 base64 chars, minus "=="
        assert_eq!(a.len(), 22);
        assert!(!a.ends_with('='));
        assert_ne!(*a, *b);
        assert!(STANDARD.decode(format!("{}==", a.as_str())).is_ok());
    }

    #[tokio::test]
    async fn reset_removes_everything_listed() {
        let store = MemoryAccountStore::new();
        for key in keys::IDENTITY_RESET_KEYS {
            store.put(key, StoreValue::Bool(true)).await.unwrap();
        }
        store
            .put(keys::SIGN_IN_BY_LINKING, StoreValue::Bool(true))
            .await
            .unwrap();

        reset_identity(&store, &[]).await.unwrap();
        assert_eq!(store.snapshot().len(), 1);
        assert!(store.contains(keys::SIGN_IN_BY_LINKING));

        reset_identity(&store, &[keys::SIGN_IN_BY_LINKING]).await.unwrap();
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn create_account_write_order() {
        let store = MemoryAccountStore::new();
        let secrets = create_account(&store, &identity(), RegistrationDefaults::default(), &[])
            .await
            .unwrap();

        let ops = store.ops();
        let first_put = ops
            .iter()
            .position(|op| matches!(op, StoreOp::Put(_)))
            .unwrap();
        assert!(ops[..first_put]
            .iter()
            .all(|op| matches!(op, StoreOp::Remove(_))));
        assert_eq!(ops.last(), Some(&StoreOp::Put(keys::NUMBER_ID.into())));
        assert_eq!(ops[first_put], StoreOp::Put(keys::IDENTITY_KEY.into()));

        assert_eq!(
            store.get(keys::NUMBER_ID).await.unwrap(),
            Some(StoreValue::Text(format!("{}.1", secrets.account_id())))
        );
        assert_eq!(
            store.get(keys::SETTINGS_READ_RECEIPT).await.unwrap(),
            Some(StoreValue::Bool(false))
        );
        assert_eq!(
            store.get(keys::SETTINGS_TYPING_INDICATOR).await.unwrap(),
            Some(StoreValue::Bool(false))
        );
        assert_eq!(
            store.get(keys::SETTINGS_OPENGROUP_PRUNING).await.unwrap(),
            Some(StoreValue::Bool(true))
        );
        assert_eq!(
            store.get(keys::PASSWORD).await.unwrap(),
            Some(StoreValue::Text(secrets.password().to_string()))
        );
    }

    #[tokio::test]
    async fn stored_key_pair_round_trips() {
        let store = MemoryAccountStore::new();
        let id = identity();
        create_account(&store, &id, RegistrationDefaults::default(), &[])
            .await
            .unwrap();
        let stored = store.get(keys::IDENTITY_KEY).await.unwrap().unwrap();
        let restored = stored.as_key_pair().unwrap().to_identity().unwrap();
        assert_eq!(restored.account_id(), id.account_id());
    }

    #[tokio::test]
    async fn failed_put_leaves_no_account_id() {
        let store = MemoryAccountStore::new();
        store.fail_puts_to(keys::PASSWORD);
        assert!(
            create_account(&store, &identity(), RegistrationDefaults::default(), &[])
                .await
                .is_err()
        );
        assert!(store.contains(keys::IDENTITY_KEY));
        assert!(!store.contains(keys::NUMBER_ID));
    }

    #[test]
    fn debug_hides_password() {
        let secrets = AccountSecrets::new(&identity(), RegistrationDefaults::default());
        let out = format!("{:?}", secrets);
        assert!(!out.contains(secrets.password()));
    }
}
