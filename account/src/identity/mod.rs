//! # Account Identity
//!
//! Public-facing identity types: the account id that names an account on
//! the network, the display name shown to contacts, and the snapshot of
//! "who am I" that presentation code observes once registration finishes.

pub mod account_id;
pub mod display_name;

pub use account_id::{AccountIdError, AccountPublicId};
pub use display_name::{
    sanitize_display_name, validate_display_name, DisplayNameError, EnglishStrings, Localizer,
};

use serde::{Deserialize, Serialize};

/// The local user, as published when an identity becomes active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Name stored on the self-conversation.
    pub display_name: String,
    /// Id of this device's account.
    pub account_id: AccountPublicId,
    /// Id of the primary device. Equal to `account_id` for every flow in
    /// this crate.
    pub primary: AccountPublicId,
}
