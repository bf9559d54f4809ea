//! # Registration Events
//!
//! Three one-way channels leave the registration core:
//!
//! | Channel                 | Type                       | Carries                          |
//! |-------------------------|----------------------------|----------------------------------|
//! | [`EventBus`]            | `broadcast`                | [`RegistrationEvent`]s           |
//! | [`IdentityObserver`]    | `watch`                    | latest [`UserIdentity`]          |
//! | [`link_channel`]        | `mpsc`                     | [`LinkedProfile`] for activation |
//!
//! The bus is fire-and-forget: sending with nobody subscribed is fine.
//! The identity observer only ever holds the latest identity. The link
//! channel has exactly one consumer, the `ActivationListener`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

use crate::config::{EVENT_CHANNEL_CAPACITY, LINK_CHANNEL_CAPACITY};
use crate::identity::{AccountPublicId, UserIdentity};

/// Events broadcast by the registration core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RegistrationEvent {
    /// A device-link poll finished. Activation follows once a display name
    /// is known.
    #[serde(rename = "link_profile_discovered")]
    LinkProfileDiscovered {
        account_id: AccountPublicId,
        found_display_name: bool,
    },
    /// The account is registered and ready. Message pollers start on this.
    #[serde(rename = "registration_done")]
    RegistrationDone { account_id: AccountPublicId },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast bus for [`RegistrationEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RegistrationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistrationEvent> {
        self.tx.subscribe()
    }

    /// Send to every current subscriber. Returns how many there were.
    pub fn trigger(&self, event: RegistrationEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                tracing::trace!("registration event dropped: no subscribers");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// IdentityObserver
// ---------------------------------------------------------------------------

/// Holds the identity published by the last successful activation.
#[derive(Debug, Clone)]
pub struct IdentityObserver {
    tx: Arc<watch::Sender<Option<UserIdentity>>>,
}

impl IdentityObserver {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn publish(&self, identity: UserIdentity) {
        self.tx.send_replace(Some(identity));
    }

    /// The latest published identity, if any.
    pub fn current(&self) -> Option<UserIdentity> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.tx.subscribe()
    }
}

impl Default for IdentityObserver {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Link channel
// ---------------------------------------------------------------------------

/// The outcome of a device link, handed from the registrar to whoever
/// finishes activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedProfile {
    pub account_id: AccountPublicId,
    /// `None` if no name was found remotely; the user has to pick one.
    pub display_name: Option<String>,
}

/// Bounded channel from the registrar to the activation listener.
pub fn link_channel() -> (mpsc::Sender<LinkedProfile>, mpsc::Receiver<LinkedProfile>) {
    mpsc::channel(LINK_CHANNEL_CAPACITY)
}
