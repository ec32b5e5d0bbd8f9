//! Conversa - conversational state engine
//!
//! Maintains per-conversation message history behind a time-bounded cache,
//! exposes two interchangeable retention policies (recent-window and
//! full-history), and captures restorable point-in-time snapshots of a
//! conversation's state.
//!
//! Everything is constructed explicitly and passed by reference: build a
//! [`ConversationStore`] over a [`cache::CacheStore`], wire it into a
//! [`SessionOrchestrator`] together with a [`session::ModelClient`], and
//! call [`SessionOrchestrator::process_message`].

pub mod cache;
pub mod cli;
mod config;
pub mod error;
pub mod llm;
pub mod memory;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod utils;

pub use cache::{CacheStore, InMemoryCache};
pub use self::config::{LlmConfig, Settings};
pub use error::{Error, Result};
pub use memory::{RetentionPolicy, RetentionStrategy, StrategySelector};
pub use session::{
    ChatRequest, ChatResponse, ModelClient, ModelReply, ResponseMetadata, SessionOrchestrator,
    StaticSystemPrompt, SystemPromptProvider,
};
pub use snapshot::{Snapshot, SnapshotManager};
pub use store::{Conversation, ConversationStore, Message, Role};
