//! In-memory conversation list.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{
    check_existing, sort_newest_first, Conversation, ConversationController, ConversationError,
    ConversationKind, ConversationResult,
};

/// [`ConversationController`] backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryConversationController {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl MemoryConversationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.read().is_empty()
    }
}

#[async_trait]
impl ConversationController for MemoryConversationController {
    async fn get_or_create_and_wait(
        &self,
        id: &str,
        kind: ConversationKind,
    ) -> ConversationResult<Conversation> {
        if id.is_empty() {
            return Err(ConversationError::EmptyId);
        }
        let mut map = self.conversations.write();
        let entry = map
            .entry(id.to_string())
            .or_insert_with(|| Conversation::new(id, kind));
        check_existing(entry, kind)?;
        Ok(entry.clone())
    }

    async fn get(&self, id: &str) -> ConversationResult<Option<Conversation>> {
        Ok(self.conversations.read().get(id).cloned())
    }

    async fn commit(&self, conversation: &Conversation) -> ConversationResult<()> {
        let mut map = self.conversations.write();
        match map.get_mut(conversation.id()) {
            Some(slot) => {
                *slot = conversation.clone();
                Ok(())
            }
            None => Err(ConversationError::NotFound(conversation.id().to_string())),
        }
    }

    async fn list(&self) -> ConversationResult<Vec<Conversation>> {
        let mut all: Vec<Conversation> = self.conversations.read().values().cloned().collect();
        sort_newest_first(&mut all);
        Ok(all)
    }
}
