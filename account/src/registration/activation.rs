//! Identity activation: the step that turns stored secrets into a live,
//! registered account.
//!
//! Runs once per successful registration (fresh or linked), after the
//! display name is known:
//!
//! 1. store the primary device key and the registration-done flags
//! 2. initialize config sync for the account
//! 3. create the hidden, mutually-approved conversation with ourselves
//! 4. publish the [`UserIdentity`] and fire `RegistrationDone`
//!
//! Step 1 is the commitment. A failure after it leaves the install
//! registered, and nothing is rolled back.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::conversation::{ConversationController, ConversationError, ConversationKind};
use crate::events::{EventBus, IdentityObserver, RegistrationEvent};
use crate::identity::{AccountPublicId, UserIdentity};
use crate::storage::{keys, AccountStore, StoreError, StoreValue};
use crate::sync::{ConfigSync, SyncError};

use super::state::mark_registration_done;

/// Errors from [`IdentityActivation::activate`].
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("account store error: {0}")]
    Store(#[from] StoreError),

    /// The account is already marked registered when this is returned.
    #[error("config sync initialization failed: {0}")]
    SyncInit(#[source] SyncError),

    #[error("self-conversation error: {0}")]
    Conversation(#[from] ConversationError),
}

/// Completes registration for an account whose secrets are stored.
pub struct IdentityActivation {
    store: Arc<dyn AccountStore>,
    conversations: Arc<dyn ConversationController>,
    config_sync: Arc<dyn ConfigSync>,
    events: EventBus,
    identity: IdentityObserver,
}

impl IdentityActivation {
    pub fn new(
        store: Arc<dyn AccountStore>,
        conversations: Arc<dyn ConversationController>,
        config_sync: Arc<dyn ConfigSync>,
        events: EventBus,
        identity: IdentityObserver,
    ) -> Self {
        Self {
            store,
            conversations,
            config_sync,
            events,
            identity,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn identity_observer(&self) -> &IdentityObserver {
        &self.identity
    }

    /// Activate `account_id` under `display_name`.
    ///
    /// `display_name` is stored as given; validate it first.
    pub async fn activate(
        &self,
        account_id: &AccountPublicId,
        display_name: &str,
    ) -> Result<(), ActivationError> {
        info!(account_id = %account_id, "registration done, activating identity");

        self.store
            .put(
                keys::PRIMARY_DEVICE_PUB_KEY,
                StoreValue::Text(account_id.to_string()),
            )
            .await?;
        mark_registration_done(self.store.as_ref()).await?;

        if let Err(e) = self.config_sync.initialize(account_id).await {
            warn!(account_id = %account_id, error = %e, "config sync initialization failed");
            return Err(ActivationError::SyncInit(e));
        }

        let mut conversation = self
            .conversations
            .get_or_create_and_wait(account_id.as_str(), ConversationKind::Private)
            .await?;
        conversation.set_display_name(display_name);
        conversation.set_is_approved(true, false);
        conversation.set_did_approve_me(true, false);
        // Note To Self stays out of the list until used.
        conversation.set_hidden(true);
        self.conversations.commit(&conversation).await?;

        self.identity.publish(UserIdentity {
            display_name: display_name.to_string(),
            account_id: account_id.clone(),
            primary: account_id.clone(),
        });
        self.events.trigger(RegistrationEvent::RegistrationDone {
            account_id: account_id.clone(),
        });

        Ok(())
    }
}
