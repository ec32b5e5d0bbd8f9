//! Full-history retention: the entire transcript is surfaced as context.
//! This mode never discards data; destructive clearing is deliberately
//! unimplemented (an archival flag on `Conversation` is the intended
//! replacement).

use super::RetentionStrategy;
use crate::error::Result;
use crate::store::{ConversationStore, Message};
use async_trait::async_trait;
use std::sync::Arc;

pub struct FullHistory {
    store: Arc<ConversationStore>,
}

impl FullHistory {
    pub fn new(store: Arc<ConversationStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RetentionStrategy for FullHistory {
    async fn context_messages(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let Some(conversation) = self.store.find_by_id(conversation_id).await? else {
            return Ok(Vec::new());
        };

        let messages = conversation.messages;
        match limit {
            Some(limit) => {
                let start = messages.len().saturating_sub(limit);
                Ok(messages[start..].to_vec())
            }
            None => Ok(messages),
        }
    }

    async fn save_message(&self, conversation_id: &str, message: Message) -> Result<()> {
        self.store.append_message(conversation_id, message).await
    }

    /// No-op: full-history mode keeps the transcript intact.
    async fn clear(&self, _conversation_id: &str) -> Result<()> {
        Ok(())
    }
}
