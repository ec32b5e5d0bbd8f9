//! Durable storage collaborator.
//!
//! The engine currently has only a cache tier. This trait is the contract
//! a durable backend must honor once one exists: consulted on cache miss
//! before declaring a conversation absent, written through on every cache
//! write. No storage engine is mandated.

use super::conversation::{Conversation, Message};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn create(&self, conversation: &Conversation) -> Result<()>;
    async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>>;
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Conversation>>;
    async fn append_message(&self, conversation_id: &str, message: &Message) -> Result<()>;
    async fn update(&self, conversation: &Conversation) -> Result<()>;
    async fn delete(&self, conversation_id: &str) -> Result<()>;
}

/// Stub backend: every write is a no-op, every read comes back empty.
pub struct NullDurableStore;

#[async_trait]
impl DurableStore for NullDurableStore {
    async fn create(&self, _conversation: &Conversation) -> Result<()> {
        Ok(())
    }

    async fn find_by_id(&self, _conversation_id: &str) -> Result<Option<Conversation>> {
        Ok(None)
    }

    async fn find_by_owner(&self, _owner_id: &str) -> Result<Vec<Conversation>> {
        Ok(Vec::new())
    }

    async fn append_message(&self, _conversation_id: &str, _message: &Message) -> Result<()> {
        Ok(())
    }

    async fn update(&self, _conversation: &Conversation) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _conversation_id: &str) -> Result<()> {
        Ok(())
    }
}
