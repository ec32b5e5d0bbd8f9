//! Recent-window retention: only the last N messages are surfaced as
//! context. The window is a read-time view, not a storage cap — the full
//! transcript stays in the store so full-history readers and snapshots
//! keep seeing everything.

use super::RetentionStrategy;
use crate::error::Result;
use crate::store::{ConversationStore, Message};
use async_trait::async_trait;
use std::sync::Arc;

pub const DEFAULT_WINDOW_SIZE: usize = 10;

pub struct RecentWindow {
    store: Arc<ConversationStore>,
    window_size: usize,
}

impl RecentWindow {
    pub fn new(store: Arc<ConversationStore>, window_size: usize) -> Self {
        Self { store, window_size }
    }
}

#[async_trait]
impl RetentionStrategy for RecentWindow {
    async fn context_messages(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let Some(conversation) = self.store.find_by_id(conversation_id).await? else {
            return Ok(Vec::new());
        };

        let limit = limit.unwrap_or(self.window_size);
        let messages = conversation.messages;
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn save_message(&self, conversation_id: &str, message: Message) -> Result<()> {
        self.store.append_message(conversation_id, message).await
    }

    /// Replaces the stored message sequence with an empty one, atomically.
    async fn clear(&self, conversation_id: &str) -> Result<()> {
        let Some(mut conversation) = self.store.find_by_id(conversation_id).await? else {
            return Ok(());
        };
        conversation.messages = Vec::new();
        self.store.update(conversation).await
    }
}
