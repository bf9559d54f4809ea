//! # Conversations
//!
//! Just enough of the conversation list for registration to do its one job
//! there: make sure the account has exactly one note-to-self conversation,
//! named, mutually approved and hidden.
//!
//! Conversations are keyed by the peer's account id, so the self-conversation
//! is simply the conversation whose id is our own account id.

pub mod db;
pub mod memory;

pub use db::SledConversationController;
pub use memory::MemoryConversationController;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Errors from conversation storage.
#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("conversation id must not be empty")]
    EmptyId,

    #[error("conversation {0} does not exist")]
    NotFound(String),

    #[error("conversation {id} is a {existing:?} conversation, not {requested:?}")]
    KindMismatch {
        id: String,
        existing: ConversationKind,
        requested: ConversationKind,
    },

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type ConversationResult<T> = Result<T, ConversationError>;

/// What a conversation is with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationKind {
    /// One-to-one, including note-to-self.
    Private,
    /// Closed group.
    Group,
    /// Open community.
    Community,
}

/// A conversation record.
///
/// Setters change the in-memory copy only. Nothing is persisted until the
/// record is handed to [`ConversationController::commit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    kind: ConversationKind,
    display_name: Option<String>,
    is_approved: bool,
    did_approve_me: bool,
    hidden: bool,
    /// Milliseconds since the Unix epoch of the last change.
    active_at: i64,
    /// A change made with `propagate = true` that config sync has not
    /// picked up yet.
    pending_sync: bool,
}

impl Conversation {
    pub fn new(id: impl Into<String>, kind: ConversationKind) -> Self {
        Self {
            id: id.into(),
            kind,
            display_name: None,
            is_approved: false,
            did_approve_me: false,
            hidden: false,
            active_at: Utc::now().timestamp_millis(),
            pending_sync: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ConversationKind {
        self.kind
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn is_approved(&self) -> bool {
        self.is_approved
    }

    pub fn did_approve_me(&self) -> bool {
        self.did_approve_me
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn active_at(&self) -> i64 {
        self.active_at
    }

    /// Whether a propagated change is waiting for config sync.
    pub fn needs_config_sync(&self) -> bool {
        self.pending_sync
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = Some(name.into());
        self.touch();
    }

    /// We approve messages from this conversation. With `propagate`, the
    /// change is flagged for config sync.
    pub fn set_is_approved(&mut self, approved: bool, propagate: bool) {
        self.is_approved = approved;
        self.pending_sync |= propagate;
        self.touch();
    }

    /// The other side approved us. With `propagate`, the change is flagged
    /// for config sync.
    pub fn set_did_approve_me(&mut self, approved: bool, propagate: bool) {
        self.did_approve_me = approved;
        self.pending_sync |= propagate;
        self.touch();
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
        self.touch();
    }

    /// Config sync has consumed the pending change.
    pub fn mark_synced(&mut self) {
        self.pending_sync = false;
    }

    fn touch(&mut self) {
        self.active_at = self.active_at.max(Utc::now().timestamp_millis());
    }
}

/// Owns the conversation list.
#[async_trait]
pub trait ConversationController: Send + Sync {
    /// Return the conversation with `id`, creating it first if needed.
    /// Resolves only once the conversation is persisted.
    async fn get_or_create_and_wait(
        &self,
        id: &str,
        kind: ConversationKind,
    ) -> ConversationResult<Conversation>;

    async fn get(&self, id: &str) -> ConversationResult<Option<Conversation>>;

    /// Persist `conversation`. It must have been created through
    /// `get_or_create_and_wait` first.
    async fn commit(&self, conversation: &Conversation) -> ConversationResult<()>;

    /// Every conversation, most recently active first.
    async fn list(&self) -> ConversationResult<Vec<Conversation>>;
}

/// Newest first, ties broken by id so the order is stable.
pub(crate) fn sort_newest_first(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| {
        b.active_at
            .cmp(&a.active_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// An existing conversation can only be reopened as the kind it was
/// created with.
pub(crate) fn check_existing(
    existing: &Conversation,
    kind: ConversationKind,
) -> ConversationResult<()> {
    if existing.kind != kind {
        return Err(ConversationError::KindMismatch {
            id: existing.id.clone(),
            existing: existing.kind,
            requested: kind,
        });
    }
    Ok(())
}
