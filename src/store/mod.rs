//! Conversation Store
//!
//! Information Hiding:
//! - Cache keys and serialized record format hidden from users
//! - Per-conversation append locking internalized
//! - Durable-tier fallback wired in but invisible to callers
//!
//! The store is the single source of truth for the current state of a
//! conversation. Records live in the cache under a TTL refreshed on every
//! write; on cache miss the durable tier is consulted before declaring a
//! conversation absent (currently a stub).
//!
//! Append serialization is per-process only. Deployments running multiple
//! processes against a shared cache need a shared lock or compare-and-swap
//! on top of this.

use crate::cache::{keys, CacheStore};
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub mod conversation;
pub mod durable;

pub use conversation::{Conversation, Message, Role};
pub use durable::{DurableStore, NullDurableStore};

/// Default lifetime of a live conversation record.
pub const CONVERSATION_TTL: Duration = Duration::from_secs(3600);

pub struct ConversationStore {
    cache: Arc<dyn CacheStore>,
    durable: Arc<dyn DurableStore>,
    ttl: Duration,
    // Serializes the read-modify-write in append_message per conversation.
    // Appends to different conversations never contend.
    append_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationStore {
    pub fn new(cache: Arc<dyn CacheStore>, durable: Arc<dyn DurableStore>, ttl: Duration) -> Self {
        Self {
            cache,
            durable,
            ttl,
            append_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a fresh conversation and write it through.
    pub async fn create(
        &self,
        owner_id: impl Into<String>,
        model_id: Option<String>,
    ) -> Result<Conversation> {
        let conversation = Conversation::new(owner_id, model_id);
        self.write_through(&conversation).await?;
        self.durable.create(&conversation).await?;
        tracing::debug!(
            "[ConversationStore] Created conversation '{}' for owner '{}'",
            conversation.id,
            conversation.owner_id
        );
        Ok(conversation)
    }

    /// Single cache lookup, then the durable tier. `None` means absent.
    pub async fn find_by_id(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        let key = keys::conversation(conversation_id);
        if let Some(cached) = self.cache.get(&key).await? {
            return Ok(Some(decode(&cached)?));
        }
        self.durable.find_by_id(conversation_id).await
    }

    /// Best-effort lookup of an owner's conversations. Returns an empty
    /// sequence on miss; the durable tier would be the authority for
    /// completeness.
    pub async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<Conversation>> {
        let key = keys::owner_conversations(owner_id);
        if let Some(cached) = self.cache.get(&key).await? {
            return Ok(decode(&cached)?);
        }
        self.durable.find_by_owner(owner_id).await
    }

    /// Append a timestamped copy of `message` and advance `updated_at`.
    /// Fails with `NotFound` if the conversation does not exist.
    pub async fn append_message(&self, conversation_id: &str, message: Message) -> Result<()> {
        let lock = self.append_lock(conversation_id).await;
        let _guard = lock.lock().await;

        let mut conversation = self
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| Error::NotFound(conversation_id.to_string()))?;

        let message = Message {
            timestamp: chrono::Utc::now(),
            ..message
        };
        conversation.messages.push(message.clone());
        conversation.updated_at = message.timestamp;

        self.write_through(&conversation).await?;
        self.durable.append_message(conversation_id, &message).await?;
        tracing::debug!(
            "[ConversationStore] Appended {:?} message to '{}' ({} total)",
            message.role,
            conversation_id,
            conversation.messages.len()
        );
        Ok(())
    }

    /// Unconditional overwrite, refreshing `updated_at` and the TTL. Used
    /// by strategies that replace the whole message sequence atomically.
    pub async fn update(&self, mut conversation: Conversation) -> Result<()> {
        conversation.updated_at = chrono::Utc::now();
        self.write_through(&conversation).await?;
        self.durable.update(&conversation).await?;
        tracing::debug!("[ConversationStore] Updated conversation '{}'", conversation.id);
        Ok(())
    }

    /// Remove the cached record. Idempotent.
    pub async fn delete(&self, conversation_id: &str) -> Result<()> {
        self.cache.delete(&keys::conversation(conversation_id)).await?;
        self.durable.delete(conversation_id).await?;

        let mut locks = self.append_locks.lock().await;
        locks.remove(conversation_id);

        tracing::debug!("[ConversationStore] Deleted conversation '{}'", conversation_id);
        Ok(())
    }

    async fn write_through(&self, conversation: &Conversation) -> Result<()> {
        let key = keys::conversation(&conversation.id);
        self.cache.set(&key, encode(conversation)?, self.ttl).await
    }

    async fn append_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.append_locks.lock().await;
        locks
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;

    fn store() -> Arc<ConversationStore> {
        Arc::new(ConversationStore::new(
            Arc::new(InMemoryCache::new()),
            Arc::new(NullDurableStore),
            CONVERSATION_TTL,
        ))
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = store();
        let created = store.create("u1", Some("gpt-test".to_string())).await.unwrap();

        let found = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.owner_id, "u1");
        assert_eq!(found.model_id.as_deref(), Some("gpt-test"));
    }

    #[tokio::test]
    async fn test_find_nonexistent_returns_none() {
        let store = store();
        assert!(store.find_by_id("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_owner_empty_on_miss() {
        let store = store();
        let conversations = store.find_by_owner("u1").await.unwrap();
        assert!(conversations.is_empty());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = store();
        let conversation = store.create("u1", None).await.unwrap();

        for i in 0..5 {
            store
                .append_message(&conversation.id, Message::user(format!("msg {i}")))
                .await
                .unwrap();
        }

        let found = store.find_by_id(&conversation.id).await.unwrap().unwrap();
        assert_eq!(found.messages.len(), 5);
        for (i, message) in found.messages.iter().enumerate() {
            assert_eq!(message.content, format!("msg {i}"));
        }
        assert!(found.updated_at >= found.created_at);
    }

    #[tokio::test]
    async fn test_append_to_missing_conversation_fails() {
        let store = store();
        let err = store
            .append_message("nonexistent", Message::user("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(id) if id == "nonexistent"));
    }

    #[tokio::test]
    async fn test_append_stamps_timestamp() {
        let store = store();
        let conversation = store.create("u1", None).await.unwrap();

        let mut message = Message::user("hi");
        message.timestamp = chrono::DateTime::UNIX_EPOCH;
        store.append_message(&conversation.id, message).await.unwrap();

        let found = store.find_by_id(&conversation.id).await.unwrap().unwrap();
        assert!(found.messages[0].timestamp > chrono::DateTime::UNIX_EPOCH);
        assert_eq!(found.updated_at, found.messages[0].timestamp);
    }

    #[tokio::test]
    async fn test_concurrent_appends_do_not_lose_updates() {
        let store = store();
        let conversation = store.create("u1", None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let id = conversation.id.clone();
            handles.push(tokio::spawn(async move {
                store.append_message(&id, Message::user(format!("msg {i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let found = store.find_by_id(&conversation.id).await.unwrap().unwrap();
        assert_eq!(found.messages.len(), 10);
    }

    #[tokio::test]
    async fn test_update_replaces_messages_atomically() {
        let store = store();
        let conversation = store.create("u1", None).await.unwrap();
        store
            .append_message(&conversation.id, Message::user("hi"))
            .await
            .unwrap();

        let mut current = store.find_by_id(&conversation.id).await.unwrap().unwrap();
        current.messages = Vec::new();
        store.update(current).await.unwrap();

        let found = store.find_by_id(&conversation.id).await.unwrap().unwrap();
        assert!(found.messages.is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store();
        let conversation = store.create("u1", None).await.unwrap();

        store.delete(&conversation.id).await.unwrap();
        assert!(store.find_by_id(&conversation.id).await.unwrap().is_none());

        store.delete(&conversation.id).await.unwrap();
    }
}
