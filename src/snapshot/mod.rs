//! Conversation Snapshots (Mementos)
//!
//! Information Hiding:
//! - Storage key and serialization format hidden from users
//! - Snapshot failures swallowed here and surfaced as "absent"; a snapshot
//!   is a recovery artifact, never fatal to the surrounding request
//!
//! One snapshot slot per conversation: saving overwrites the previous
//! snapshot. Snapshots carry a structural copy of the messages, so they
//! stay intact while the live conversation keeps mutating, and they live
//! under a much longer TTL than the conversation itself.

use crate::cache::{keys, CacheStore};
use crate::error::Result;
use crate::store::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a snapshot: 24 hours, an order of magnitude longer
/// than the live conversation so it survives the session's natural expiry.
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(86_400);

/// Immutable point-in-time copy of a conversation's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub model_id: String,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(
        conversation_id: impl Into<String>,
        messages: Vec<Message>,
        model_id: impl Into<String>,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            messages,
            model_id: model_id.into(),
            taken_at,
        }
    }

    /// Serialize to the storage-ready form. Round-trips exactly, including
    /// timestamp precision (RFC 3339 with nanoseconds).
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn deserialize(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

pub struct SnapshotManager {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl SnapshotManager {
    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Store `snapshot` in its conversation's slot, overwriting any
    /// previous snapshot. Failures are logged and swallowed.
    pub async fn save(&self, snapshot: &Snapshot) {
        let key = keys::memento(&snapshot.conversation_id);
        let payload = match snapshot.serialize() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    "[SnapshotManager] Failed to serialize snapshot for '{}': {}",
                    snapshot.conversation_id,
                    e
                );
                return;
            }
        };

        if let Err(e) = self.cache.set(&key, payload, self.ttl).await {
            tracing::warn!(
                "[SnapshotManager] Failed to store snapshot for '{}': {}",
                snapshot.conversation_id,
                e
            );
        } else {
            tracing::debug!(
                "[SnapshotManager] Saved snapshot for '{}' ({} messages)",
                snapshot.conversation_id,
                snapshot.messages.len()
            );
        }
    }

    /// Look up the stored snapshot. `None` covers "never saved", "expired"
    /// and "corrupt" alike; no prior snapshot is an expected state.
    pub async fn restore(&self, conversation_id: &str) -> Option<Snapshot> {
        let key = keys::memento(conversation_id);
        let payload = match self.cache.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(
                    "[SnapshotManager] Failed to read snapshot for '{}': {}",
                    conversation_id,
                    e
                );
                return None;
            }
        };

        match Snapshot::deserialize(&payload) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(
                    "[SnapshotManager] Stored snapshot for '{}' is unreadable, treating as absent: {}",
                    conversation_id,
                    e
                );
                None
            }
        }
    }
}
