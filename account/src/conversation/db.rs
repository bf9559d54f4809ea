//! Sled-backed conversation list.
//!
//! Lives in the `conversations` tree of the account database. Creation uses
//! a compare-and-swap on the empty slot, so two racing `get_or_create_and_wait`
//! calls for the same id still end up with one record.

use async_trait::async_trait;
use sled::Tree;

use super::{
    check_existing, sort_newest_first, Conversation, ConversationController, ConversationError,
    ConversationKind, ConversationResult,
};
use crate::storage::{SledAccountStore, StoreError};

/// [`ConversationController`] persisted in sled.
#[derive(Debug, Clone)]
pub struct SledConversationController {
    tree: Tree,
}

impl SledConversationController {
    /// Open the conversation list inside an account database.
    pub fn open(store: &SledAccountStore) -> Result<Self, StoreError> {
        Ok(Self {
            tree: store.open_tree("conversations")?,
        })
    }

    fn decode(bytes: &[u8]) -> ConversationResult<Conversation> {
        bincode::deserialize(bytes).map_err(|e| ConversationError::Serialization(e.to_string()))
    }

    fn encode(conversation: &Conversation) -> ConversationResult<Vec<u8>> {
        bincode::serialize(conversation)
            .map_err(|e| ConversationError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl ConversationController for SledConversationController {
    async fn get_or_create_and_wait(
        &self,
        id: &str,
        kind: ConversationKind,
    ) -> ConversationResult<Conversation> {
        if id.is_empty() {
            return Err(ConversationError::EmptyId);
        }

        let fresh = Conversation::new(id, kind);
        let swap = self
            .tree
            .compare_and_swap(id.as_bytes(), None::<&[u8]>, Some(Self::encode(&fresh)?))?;

        let conversation = match swap {
            Ok(()) => {
                self.tree.flush_async().await?;
                tracing::debug!(conversation = id, ?kind, "conversation created");
                fresh
            }
            Err(existing) => {
                let bytes = existing
                    .current
                    .ok_or_else(|| ConversationError::NotFound(id.to_string()))?;
                let conversation = Self::decode(&bytes)?;
                check_existing(&conversation, kind)?;
                conversation
            }
        };
        Ok(conversation)
    }

    async fn get(&self, id: &str) -> ConversationResult<Option<Conversation>> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn commit(&self, conversation: &Conversation) -> ConversationResult<()> {
        if !self.tree.contains_key(conversation.id().as_bytes())? {
            return Err(ConversationError::NotFound(conversation.id().to_string()));
        }
        self.tree
            .insert(conversation.id().as_bytes(), Self::encode(conversation)?)?;
        self.tree.flush_async().await?;
        Ok(())
    }

    async fn list(&self) -> ConversationResult<Vec<Conversation>> {
        let mut all = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            all.push(Self::decode(&bytes)?);
        }
        sort_newest_first(&mut all);
        Ok(all)
    }
}
