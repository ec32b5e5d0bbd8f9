//! Cache key builder.
//!
//! Centralizes key construction so every component addresses the same
//! namespaces. Conversations and snapshots live in independent key spaces;
//! deleting one never affects the other.

/// Key for a live conversation record.
pub fn conversation(conversation_id: &str) -> String {
    format!("conversation:{conversation_id}")
}

/// Key for the single snapshot slot of a conversation.
pub fn memento(conversation_id: &str) -> String {
    format!("memento:{conversation_id}")
}

/// Key for the per-owner conversation index.
pub fn owner_conversations(owner_id: &str) -> String {
    format!("user:conversations:{owner_id}")
}
