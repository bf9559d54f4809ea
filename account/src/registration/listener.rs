//! Finishes device links.
//!
//! The registrar never activates a linked account itself. It sends a
//! [`LinkedProfile`] down the link channel and this listener picks it up:
//! a usable name means activate now, anything else means the user has to
//! pick a name and register again with a completion callback.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::events::LinkedProfile;
use crate::identity::{validate_display_name, AccountPublicId, Localizer};

use super::activation::{ActivationError, IdentityActivation};

/// What the listener did with one linked profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerOutcome {
    Activated(AccountPublicId),
    /// No usable name came with the profile.
    NeedsDisplayName(AccountPublicId),
}

pub struct ActivationListener {
    activation: Arc<IdentityActivation>,
    localizer: Arc<dyn Localizer>,
    rx: mpsc::Receiver<LinkedProfile>,
}

impl ActivationListener {
    pub fn new(
        activation: Arc<IdentityActivation>,
        localizer: Arc<dyn Localizer>,
        rx: mpsc::Receiver<LinkedProfile>,
    ) -> Self {
        Self {
            activation,
            localizer,
            rx,
        }
    }

    /// Handle one profile.
    pub async fn handle(&self, profile: LinkedProfile) -> Result<ListenerOutcome, ActivationError> {
        let LinkedProfile {
            account_id,
            display_name,
        } = profile;

        let Some(raw) = display_name else {
            info!(account_id = %account_id, "linked without a display name");
            return Ok(ListenerOutcome::NeedsDisplayName(account_id));
        };

        let name = match validate_display_name(&raw, self.localizer.as_ref()) {
            Ok(name) => name,
            Err(e) => {
                warn!(account_id = %account_id, error = %e, "linked display name rejected");
                return Ok(ListenerOutcome::NeedsDisplayName(account_id));
            }
        };

        self.activation.activate(&account_id, &name).await?;
        Ok(ListenerOutcome::Activated(account_id))
    }

    /// Wait for the next profile and handle it. `None` once every sender
    /// is gone.
    pub async fn next(&mut self) -> Option<Result<ListenerOutcome, ActivationError>> {
        let profile = self.rx.recv().await?;
        Some(self.handle(profile).await)
    }

    /// Handle profiles until the channel closes. Returns the number of
    /// accounts activated.
    pub async fn run(mut self) -> usize {
        let mut activated = 0;
        while let Some(result) = self.next().await {
            match result {
                Ok(ListenerOutcome::Activated(_)) => activated += 1,
                Ok(ListenerOutcome::NeedsDisplayName(_)) => {}
                Err(e) => warn!(error = %e, "activation after link failed"),
            }
        }
        activated
    }
}
