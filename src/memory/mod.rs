//! Retention Strategies
//!
//! Information Hiding:
//! - How much history reaches the model is a policy, hidden behind a trait
//! - Policy selection is a closed enum with an exhaustive match, so adding
//!   a policy is a compile-time-checked change, not a runtime default

use crate::error::{Error, Result};
use crate::store::{ConversationStore, Message};
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;

pub mod full_history;
pub mod recent_window;

pub use full_history::FullHistory;
pub use recent_window::RecentWindow;

/// Policy governing which subset of history is surfaced as model context.
#[async_trait]
pub trait RetentionStrategy: Send + Sync {
    /// Messages to expose as context. Empty if the conversation does not
    /// exist. `limit` overrides the strategy's own default, if it has one.
    async fn context_messages(
        &self,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>>;

    /// Append a message under this policy.
    async fn save_message(&self, conversation_id: &str, message: Message) -> Result<()>;

    /// Discard retained history. Strategy-dependent; may be a no-op.
    async fn clear(&self, conversation_id: &str) -> Result<()>;
}

/// The closed set of retention policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    RecentWindow,
    FullHistory,
}

impl RetentionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecentWindow => "recent-window",
            Self::FullHistory => "full-history",
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = Error;

    fn from_str(tag: &str) -> Result<Self> {
        match tag {
            "recent-window" => Ok(Self::RecentWindow),
            "full-history" => Ok(Self::FullHistory),
            other => Err(Error::UnsupportedPolicy(other.to_string())),
        }
    }
}

/// Owns one instance of each strategy and hands them out by policy.
pub struct StrategySelector {
    recent_window: RecentWindow,
    full_history: FullHistory,
}

impl StrategySelector {
    pub fn new(store: Arc<ConversationStore>, window_size: usize) -> Self {
        Self {
            recent_window: RecentWindow::new(store.clone(), window_size),
            full_history: FullHistory::new(store),
        }
    }

    pub fn select(&self, policy: RetentionPolicy) -> &dyn RetentionStrategy {
        match policy {
            RetentionPolicy::RecentWindow => &self.recent_window,
            RetentionPolicy::FullHistory => &self.full_history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_tags_round_trip() {
        for policy in [RetentionPolicy::RecentWindow, RetentionPolicy::FullHistory] {
            assert_eq!(policy.as_str().parse::<RetentionPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = "unknown".parse::<RetentionPolicy>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedPolicy(tag) if tag == "unknown"));
    }
}
