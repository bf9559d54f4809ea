//! The registrar: both ways of getting an account onto this device.
//!
//! ```text
//! register_fresh_account                 link_existing_account
//! ----------------------                 ---------------------
//! check inputs                           check inputs
//! phrase -> keypair                      phrase -> keypair
//! reset (incl. linking flag)             linking flag = true
//! persist secrets                        reset + persist secrets
//! save phrase                            save phrase
//! callback, or activate                  poll for display name (cancellable)
//!                                        hand the result to the listener
//! ```
//!
//! Inputs are checked before the store is touched. Past that point a
//! failure can leave a partial identity behind; the next attempt resets it.

use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::RegistrationDefaults;
use crate::crypto::{derive_identity, IdentityKeyPair};
use crate::events::{EventBus, LinkedProfile, RegistrationEvent};
use crate::identity::{self, AccountPublicId, DisplayNameError, Localizer};
use crate::mnemonic::{self, MnemonicLanguage};
use crate::storage::{keys, AccountStore};
use crate::sync::{LinkCancellation, ProfilePoller};

use super::activation::IdentityActivation;
use super::secrets::{create_account, save_recovery_phrase, set_sign_in_by_linking};
use super::RegistrationError;

/// Runs in place of activation at the end of a fresh registration.
///
/// Receives the new account id. Used when a failed link falls back to
/// asking the user for a name; see [`Registrar::link_completion_callback`].
pub type RegistrationCallback =
    Box<dyn FnOnce(AccountPublicId) -> BoxFuture<'static, Result<(), RegistrationError>> + Send>;

/// What a device link produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub account_id: AccountPublicId,
    /// The name found remotely. Always `None` when cancelled.
    pub display_name: Option<String>,
    pub cancelled: bool,
}

/// Decode `phrase` and derive the identity keypair from its seed.
pub fn derive_keypair_from_mnemonic(
    phrase: &str,
    language: &str,
) -> Result<IdentityKeyPair, RegistrationError> {
    let language = MnemonicLanguage::from_name(language)?;
    let seed_hex = zeroize::Zeroizing::new(mnemonic::decode(phrase, language)?);
    Ok(derive_identity(&seed_hex)?)
}

/// `value` with surrounding whitespace removed, or `MissingInput` if
/// nothing is left.
fn require<'a>(value: &'a str, name: &'static str) -> Result<&'a str, RegistrationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RegistrationError::MissingInput(name));
    }
    Ok(value)
}

pub struct Registrar {
    store: Arc<dyn AccountStore>,
    poller: Arc<dyn ProfilePoller>,
    activation: Arc<IdentityActivation>,
    link_tx: mpsc::Sender<LinkedProfile>,
    localizer: Arc<dyn Localizer>,
    defaults: RegistrationDefaults,
}

impl Registrar {
    pub fn new(
        store: Arc<dyn AccountStore>,
        poller: Arc<dyn ProfilePoller>,
        activation: Arc<IdentityActivation>,
        link_tx: mpsc::Sender<LinkedProfile>,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            store,
            poller,
            activation,
            link_tx,
            localizer,
            defaults: RegistrationDefaults::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: RegistrationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn events(&self) -> &EventBus {
        self.activation.events()
    }

    pub fn activation(&self) -> &Arc<IdentityActivation> {
        &self.activation
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    /// Check a user-entered display name. Returns the name to register with.
    pub fn validate_display_name(&self, name: &str) -> Result<String, DisplayNameError> {
        identity::validate_display_name(name, self.localizer.as_ref())
    }

    /// Register a brand-new account from `phrase`.
    ///
    /// With no callback, the account is activated under `display_name`,
    /// trimmed, before this returns. With a callback, the callback gets the account
    /// id instead and activation is up to it.
    pub async fn register_fresh_account(
        &self,
        phrase: &str,
        language: &str,
        display_name: &str,
        callback: Option<RegistrationCallback>,
    ) -> Result<AccountPublicId, RegistrationError> {
        let phrase = require(phrase, "recovery phrase")?;
        let language = require(language, "mnemonic language")?;
        let display_name = require(display_name, "display name")?;

        let keypair = derive_keypair_from_mnemonic(phrase, language)?;

        create_account(
            self.store.as_ref(),
            &keypair,
            self.defaults,
            &[keys::SIGN_IN_BY_LINKING],
        )
        .await?;
        save_recovery_phrase(self.store.as_ref(), phrase).await?;

        let account_id = keypair.account_id();
        if account_id.is_empty() {
            return Err(RegistrationError::DerivationFailure);
        }

        match callback {
            Some(callback) => {
                debug!(account_id = %account_id, "handing fresh account to callback");
                callback(account_id.clone()).await?;
            }
            None => {
                self.activation.activate(&account_id, display_name).await?;
            }
        }

        info!(account_id = %account_id, "fresh account registered");
        Ok(account_id)
    }

    /// Restore an account from `phrase` and look for its display name.
    ///
    /// The store is left in the pending-linking state. Unless cancelled, the
    /// result is sent to the activation listener, which activates right away
    /// if a name was found.
    pub async fn link_existing_account(
        &self,
        phrase: &str,
        language: &str,
        cancel: &LinkCancellation,
    ) -> Result<LinkOutcome, RegistrationError> {
        let phrase = require(phrase, "recovery phrase")?;
        let language = require(language, "mnemonic language")?;

        let keypair = derive_keypair_from_mnemonic(phrase, language)?;

        set_sign_in_by_linking(self.store.as_ref(), true).await?;
        create_account(self.store.as_ref(), &keypair, self.defaults, &[]).await?;
        save_recovery_phrase(self.store.as_ref(), phrase).await?;

        let account_id = keypair.account_id();
        if account_id.is_empty() {
            return Err(RegistrationError::DerivationFailure);
        }
        info!(account_id = %account_id, "linked account restored, polling for profile");

        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            res = self.poller.poll_once_for_display_name(&account_id, cancel) => Some(res?),
        };

        let display_name = match polled {
            Some(name) if !cancel.is_cancelled() => name,
            _ => {
                info!(account_id = %account_id, "profile poll cancelled, account left pending");
                return Ok(LinkOutcome {
                    account_id,
                    display_name: None,
                    cancelled: true,
                });
            }
        };

        self.events().trigger(RegistrationEvent::LinkProfileDiscovered {
            account_id: account_id.clone(),
            found_display_name: display_name.is_some(),
        });
        let profile = LinkedProfile {
            account_id: account_id.clone(),
            display_name: display_name.clone(),
        };
        if self.link_tx.send(profile).await.is_err() {
            warn!(account_id = %account_id, "activation listener is gone; linked profile dropped");
        }

        Ok(LinkOutcome {
            account_id,
            display_name,
            cancelled: false,
        })
    }

    /// Callback for [`Registrar::register_fresh_account`] when a link found
    /// no name and the user typed one in: sends the new account and that
    /// name to the activation listener.
    pub fn link_completion_callback(&self, display_name: impl Into<String>) -> RegistrationCallback {
        let tx = self.link_tx.clone();
        let display_name = display_name.into();
        Box::new(move |account_id| {
            Box::pin(async move {
                tx.send(LinkedProfile {
                    account_id,
                    display_name: Some(display_name),
                })
                .await
                .map_err(|_| RegistrationError::Callback("activation listener is gone".into()))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationController, MemoryConversationController};
    use crate::events::{link_channel, IdentityObserver};
    use crate::identity::EnglishStrings;
    use crate::mnemonic::MnemonicError;
    use crate::registration::{load_registration_state, RegistrationState};
    use crate::storage::{MemoryAccountStore, StoreValue};
    use crate::sync::{link_cancellation, PollError, StoreBackedConfigSync};
    use async_trait::async_trait;

    const PHRASE_SEED: &str = "00112233445566778899aabbccddeeff";

    fn phrase() -> String {
        mnemonic::encode(PHRASE_SEED, MnemonicLanguage::English).unwrap()
    }

    struct StaticPoller(Result<Option<&'static str>, PollError>);

    #[async_trait]
    impl ProfilePoller for StaticPoller {
        async fn poll_once_for_display_name(
            &self,
            _: &AccountPublicId,
            _: &LinkCancellation,
        ) -> Result<Option<String>, PollError> {
            self.0.clone().map(|n| n.map(str::to_string))
        }
    }

    struct PendingPoller;

    #[async_trait]
    impl ProfilePoller for PendingPoller {
        async fn poll_once_for_display_name(
            &self,
            _: &AccountPublicId,
            _: &LinkCancellation,
        ) -> Result<Option<String>, PollError> {
            std::future::pending().await
        }
    }

    struct Harness {
        store: Arc<MemoryAccountStore>,
        conversations: Arc<MemoryConversationController>,
        registrar: Registrar,
        link_rx: mpsc::Receiver<LinkedProfile>,
    }

    fn harness(poller: Arc<dyn ProfilePoller>) -> Harness {
        let store = Arc::new(MemoryAccountStore::new());
        let conversations = Arc::new(MemoryConversationController::new());
        let activation = Arc::new(IdentityActivation::new(
            store.clone(),
            conversations.clone(),
            Arc::new(StoreBackedConfigSync::new(store.clone())),
            EventBus::new(),
            IdentityObserver::new(),
        ));
        let (link_tx, link_rx) = link_channel();
        let registrar = Registrar::new(
            store.clone(),
            poller,
            activation,
            link_tx,
            Arc::new(EnglishStrings),
        );
        Harness {
            store,
            conversations,
            registrar,
            link_rx,
        }
    }

    #[test]
    fn keypair_from_phrase_matches_seed() {
        let from_phrase = derive_keypair_from_mnemonic(&phrase(), "english").unwrap();
        let direct = derive_identity(PHRASE_SEED).unwrap();
        assert_eq!(from_phrase.account_id(), direct.account_id());
    }

    #[test]
    fn unknown_language_is_rejected() {
        let err = derive_keypair_from_mnemonic(&phrase(), "klingon").unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Mnemonic(MnemonicError::UnsupportedLanguage(_))
        ));
    }

    #[tokio::test]
    async fn missing_inputs_touch_nothing() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        let p = phrase();

        for (phrase, lang, name) in [("", "english", "Alice"), (p.as_str(), "", "Alice"), (p.as_str(), "english", "  ")] {
            let err = h
                .registrar
                .register_fresh_account(phrase, lang, name, None)
                .await
                .unwrap_err();
            assert!(matches!(err, RegistrationError::MissingInput(_)));
        }
        let err = h
            .registrar
            .link_existing_account("", "english", &LinkCancellation::never())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingInput(_)));

        assert!(h.store.ops().is_empty());
    }

    #[tokio::test]
    async fn bad_phrase_touches_nothing() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        let err = h
            .registrar
            .register_fresh_account("abbey abbey abbey", "english", "Alice", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Mnemonic(_)));
        assert!(h.store.ops().is_empty());
    }

    #[tokio::test]
    async fn fresh_registration_activates() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        let id = h
            .registrar
            .register_fresh_account(&phrase(), "english", "Alice", None)
            .await
            .unwrap();

        assert_eq!(id, derive_identity(PHRASE_SEED).unwrap().account_id());
        assert_eq!(
            load_registration_state(h.store.as_ref()).await.unwrap(),
            RegistrationState::Registered
        );
        assert_eq!(
            h.store.get(keys::MNEMONIC).await.unwrap(),
            Some(StoreValue::Text(phrase()))
        );
        let me = h.conversations.get(id.as_str()).await.unwrap().unwrap();
        assert_eq!(me.display_name(), Some("Alice"));
        assert!(me.is_hidden());
    }

    #[tokio::test]
    async fn fresh_registration_trims_display_name() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        let id = h
            .registrar
            .register_fresh_account(&phrase(), "english", "  Alice \n", None)
            .await
            .unwrap();
        let me = h.conversations.get(id.as_str()).await.unwrap().unwrap();
        assert_eq!(me.display_name(), Some("Alice"));
        assert_eq!(
            h.registrar
                .activation()
                .identity_observer()
                .current()
                .unwrap()
                .display_name,
            "Alice"
        );
    }

    #[tokio::test]
    async fn fresh_registration_clears_linking_flag() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        set_sign_in_by_linking(h.store.as_ref(), true).await.unwrap();
        h.registrar
            .register_fresh_account(&phrase(), "english", "Alice", None)
            .await
            .unwrap();
        assert!(!h.store.contains(keys::SIGN_IN_BY_LINKING));
    }

    #[tokio::test]
    async fn callback_replaces_activation() {
        let mut h = harness(Arc::new(StaticPoller(Ok(None))));
        let callback = h.registrar.link_completion_callback("Alice");
        let id = h
            .registrar
            .register_fresh_account(&phrase(), "english", "Alice", Some(callback))
            .await
            .unwrap();

        assert_eq!(
            h.link_rx.recv().await.unwrap(),
            LinkedProfile {
                account_id: id,
                display_name: Some("Alice".into()),
            }
        );
        assert_eq!(
            load_registration_state(h.store.as_ref()).await.unwrap(),
            RegistrationState::Unregistered
        );
        assert!(h.conversations.is_empty());
    }

    #[tokio::test]
    async fn failing_callback_is_reported() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        let callback: RegistrationCallback = Box::new(|_| {
            Box::pin(async { Err(RegistrationError::Callback("nope".into())) })
        });
        let err = h
            .registrar
            .register_fresh_account(&phrase(), "english", "Alice", Some(callback))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Callback(_)));
    }

    #[tokio::test]
    async fn link_sends_found_name() {
        let mut h = harness(Arc::new(StaticPoller(Ok(Some("Alice")))));
        let mut events = h.registrar.events().subscribe();

        let outcome = h
            .registrar
            .link_existing_account(&phrase(), "english", &LinkCancellation::never())
            .await
            .unwrap();
        assert_eq!(outcome.display_name.as_deref(), Some("Alice"));
        assert!(!outcome.cancelled);

        assert_eq!(
            load_registration_state(h.store.as_ref()).await.unwrap(),
            RegistrationState::PendingLinking
        );
        assert_eq!(
            events.recv().await.unwrap(),
            RegistrationEvent::LinkProfileDiscovered {
                account_id: outcome.account_id.clone(),
                found_display_name: true,
            }
        );
        assert_eq!(
            h.link_rx.recv().await.unwrap().display_name.as_deref(),
            Some("Alice")
        );
    }

    #[tokio::test]
    async fn link_without_name_still_reports() {
        let mut h = harness(Arc::new(StaticPoller(Ok(None))));
        let outcome = h
            .registrar
            .link_existing_account(&phrase(), "english", &LinkCancellation::never())
            .await
            .unwrap();
        assert!(outcome.display_name.is_none());
        assert!(h.link_rx.recv().await.unwrap().display_name.is_none());
    }

    #[tokio::test]
    async fn cancelled_link_stays_pending() {
        let mut h = harness(Arc::new(PendingPoller));
        let mut events = h.registrar.events().subscribe();
        let (handle, token) = link_cancellation();
        handle.cancel();

        let outcome = h
            .registrar
            .link_existing_account(&phrase(), "english", &token)
            .await
            .unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.display_name.is_none());
        assert_eq!(
            load_registration_state(h.store.as_ref()).await.unwrap(),
            RegistrationState::PendingLinking
        );
        assert!(events.try_recv().is_err());
        assert!(h.link_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn poll_failure_is_propagated() {
        let h = harness(Arc::new(StaticPoller(Err(PollError::Unreachable { attempts: 3 }))));
        let err = h
            .registrar
            .link_existing_account(&phrase(), "english", &LinkCancellation::never())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ProfilePoll(_)));
        assert_eq!(
            load_registration_state(h.store.as_ref()).await.unwrap(),
            RegistrationState::PendingLinking
        );
    }

    #[tokio::test]
    async fn registering_twice_leaves_one_identity() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        h.registrar
            .register_fresh_account(&phrase(), "english", "Alice", None)
            .await
            .unwrap();
        let first_password = h.store.get(keys::PASSWORD).await.unwrap();

        let other = mnemonic::encode("ffeeddccbbaa99887766554433221100", MnemonicLanguage::English)
            .unwrap();
        let id = h
            .registrar
            .register_fresh_account(&other, "english", "Bob", None)
            .await
            .unwrap();

        assert_ne!(h.store.get(keys::PASSWORD).await.unwrap(), first_password);
        assert_eq!(
            h.store.get(keys::NUMBER_ID).await.unwrap(),
            Some(StoreValue::Text(id.device_id()))
        );
        assert_eq!(
            h.store.get(keys::MNEMONIC).await.unwrap(),
            Some(StoreValue::Text(other))
        );
    }

    #[tokio::test]
    async fn display_names_are_validated() {
        let h = harness(Arc::new(StaticPoller(Ok(None))));
        assert_eq!(h.registrar.validate_display_name("  Alice ").unwrap(), "Alice");
        assert!(h.registrar.validate_display_name("\u{200B}").is_err());
        assert!(h.registrar.validate_display_name(&"x".repeat(65)).is_err());
    }
}
