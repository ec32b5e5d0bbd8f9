//! Conversation and message records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One entry of a conversation transcript. Immutable once appended;
/// insertion order is the dialogue order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// The ordered transcript and metadata for one chat session.
///
/// `messages` is append-only in normal operation; only an explicit clear
/// (Recent-Window strategy) replaces the whole sequence, atomically via
/// `ConversationStore::update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub owner_id: String,
    pub model_id: Option<String>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set by a future archival clear in full-history mode; nothing
    /// toggles it yet.
    #[serde(default)]
    pub archived: bool,
}

impl Conversation {
    pub fn new(owner_id: impl Into<String>, model_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("conv_{}", Uuid::new_v4()),
            owner_id: owner_id.into(),
            model_id,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            archived: false,
        }
    }
}
