//! # Registration
//!
//! Getting an account onto this device, start to finish.
//!
//! ```text
//! orchestrator.rs - Registrar: fresh registration and device linking
//! secrets.rs      - reset the local identity, write a new one
//! activation.rs   - IdentityActivation: mark registered, self-conversation, events
//! listener.rs     - ActivationListener: finishes device links
//! state.rs        - RegistrationState, read back from the store
//! ```
//!
//! [`onboarding`] wires the pieces together the usual way.

pub mod activation;
pub mod listener;
pub mod orchestrator;
pub mod secrets;
pub mod state;

pub use activation::{ActivationError, IdentityActivation};
pub use listener::{ActivationListener, ListenerOutcome};
pub use orchestrator::{derive_keypair_from_mnemonic, LinkOutcome, Registrar, RegistrationCallback};
pub use secrets::{
    create_account, generate_local_password, reset_identity, save_recovery_phrase,
    set_local_pub_key, set_sign_in_by_linking, AccountSecrets,
};
pub use state::{load_account_id, load_registration_state, RegistrationState};

use std::sync::Arc;
use thiserror::Error;

use crate::conversation::ConversationController;
use crate::crypto::DerivationError;
use crate::events::{link_channel, EventBus, IdentityObserver};
use crate::identity::Localizer;
use crate::mnemonic::MnemonicError;
use crate::storage::{AccountStore, StoreError};
use crate::sync::{ConfigSync, PollError, ProfilePoller};

/// Errors from the registration flows.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A required input was empty. Nothing was written.
    #[error("missing {0}")]
    MissingInput(&'static str),

    #[error("invalid recovery phrase: {0}")]
    Mnemonic(#[from] MnemonicError),

    #[error("key derivation failed: {0}")]
    Derivation(#[from] DerivationError),

    #[error("derived account id is empty")]
    DerivationFailure,

    #[error("account store error: {0}")]
    Store(#[from] StoreError),

    #[error("profile discovery failed: {0}")]
    ProfilePoll(#[from] PollError),

    #[error("registration callback failed: {0}")]
    Callback(String),

    #[error("activation failed: {0}")]
    Activation(#[from] ActivationError),
}

impl RegistrationError {
    /// True if the account ended up registered despite the error.
    pub fn left_registered(&self) -> bool {
        matches!(self, RegistrationError::Activation(ActivationError::SyncInit(_)))
    }
}

/// A registrar and the listener that finishes its device links, sharing
/// one event bus and identity observer.
pub fn onboarding(
    store: Arc<dyn AccountStore>,
    conversations: Arc<dyn ConversationController>,
    config_sync: Arc<dyn ConfigSync>,
    poller: Arc<dyn ProfilePoller>,
    localizer: Arc<dyn Localizer>,
) -> (Registrar, ActivationListener) {
    let activation = Arc::new(IdentityActivation::new(
        store.clone(),
        conversations,
        config_sync,
        EventBus::new(),
        IdentityObserver::new(),
    ));
    let (link_tx, link_rx) = link_channel();
    let registrar = Registrar::new(
        store,
        poller,
        activation.clone(),
        link_tx,
        localizer.clone(),
    );
    let listener = ActivationListener::new(activation, localizer, link_rx);
    (registrar, listener)
}
