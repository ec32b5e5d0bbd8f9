//! Conversation Session Orchestrator
//!
//! Runs one chat exchange as a single unit of work: resolve or create the
//! conversation, pick a retention strategy, read context, append the user
//! message, invoke the model, append the reply, snapshot, and re-read the
//! transcript for the response payload.
//!
//! Each conversation is assumed to have one active request at a time from
//! the caller's perspective; within the process, `ConversationStore`
//! serializes appends per conversation. A request that fails mid-sequence
//! leaves its earlier writes in place (at-least-once effects), so a retry
//! may duplicate its own user message in the transcript.

use crate::error::{Error, Result};
use crate::memory::{RetentionPolicy, StrategySelector};
use crate::snapshot::{Snapshot, SnapshotManager};
use crate::store::{Conversation, ConversationStore, Message};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// The external model invocation. Implementations own their transport,
/// timeouts and retries; the orchestrator never retries on their behalf.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<ModelReply>;
}

#[derive(Debug, Clone)]
pub struct ModelReply {
    pub text: String,
    pub total_tokens: Option<u64>,
}

/// Pure, side-effect-free source of the system prompt.
pub trait SystemPromptProvider: Send + Sync {
    fn system_prompt(&self) -> &str;
}

/// Fixed system prompt, built once at startup.
pub struct StaticSystemPrompt(String);

impl StaticSystemPrompt {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self(prompt.into())
    }
}

impl SystemPromptProvider for StaticSystemPrompt {
    fn system_prompt(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub owner_id: String,
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: String,
    pub messages: Vec<Message>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub model_id: String,
    pub tokens_used: Option<u64>,
    pub response_time_ms: u64,
}

pub struct SessionOrchestrator {
    store: Arc<ConversationStore>,
    strategies: StrategySelector,
    snapshots: SnapshotManager,
    model: Arc<dyn ModelClient>,
    prompts: Arc<dyn SystemPromptProvider>,
    default_model_id: String,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<ConversationStore>,
        strategies: StrategySelector,
        snapshots: SnapshotManager,
        model: Arc<dyn ModelClient>,
        prompts: Arc<dyn SystemPromptProvider>,
        default_model_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            strategies,
            snapshots,
            model,
            prompts,
            default_model_id: default_model_id.into(),
        }
    }

    /// Process one chat message. Either the full sequence completes and a
    /// response is returned, or a single `ProcessingFailed` error is
    /// returned (with `NotFound` and `UnsupportedPolicy` passing through
    /// unwrapped, since callers can act on them distinctly).
    pub async fn process_message(
        &self,
        request: ChatRequest,
        conversation_id: Option<&str>,
        policy: RetentionPolicy,
    ) -> Result<ChatResponse> {
        self.run(request, conversation_id, policy)
            .await
            .map_err(|err| match err {
                passthrough @ (Error::NotFound(_) | Error::UnsupportedPolicy(_)) => passthrough,
                other => Error::ProcessingFailed {
                    source: Box::new(other),
                },
            })
    }

    async fn run(
        &self,
        request: ChatRequest,
        conversation_id: Option<&str>,
        policy: RetentionPolicy,
    ) -> Result<ChatResponse> {
        // 1. Resolve or create the conversation
        let conversation = self
            .resolve_conversation(conversation_id, &request)
            .await?;
        let conversation_id = conversation.id.clone();

        tracing::info!(
            "[Session {}] Processing message for owner '{}' under {:?}",
            conversation_id,
            request.owner_id,
            policy
        );

        // 2. Select the retention strategy
        let strategy = self.strategies.select(policy);

        // 3. Read the context this policy exposes
        let context = strategy.context_messages(&conversation_id, None).await?;

        // 4. Append the user message
        let user_message = Message::user(&request.prompt);
        strategy
            .save_message(&conversation_id, user_message.clone())
            .await?;

        // 5. Invoke the model collaborator
        let model_id = request
            .model_id
            .clone()
            .unwrap_or_else(|| self.default_model_id.clone());
        let started = Instant::now();
        let reply = self
            .model
            .generate(self.prompts.system_prompt(), &request.prompt)
            .await?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        // 6. Append the assistant message with usage/timing metadata
        let mut assistant_message = Message::assistant(&reply.text)
            .with_metadata("model_id", json!(model_id))
            .with_metadata("response_time_ms", json!(response_time_ms));
        if let Some(tokens) = reply.total_tokens {
            assistant_message = assistant_message.with_metadata("tokens_used", json!(tokens));
        }
        strategy
            .save_message(&conversation_id, assistant_message.clone())
            .await?;

        // 7. Snapshot context + the two new messages (best-effort)
        let mut snapshot_messages = context;
        snapshot_messages.push(user_message);
        snapshot_messages.push(assistant_message);
        let snapshot = Snapshot::new(
            conversation_id.clone(),
            snapshot_messages,
            model_id.clone(),
            Utc::now(),
        );
        self.snapshots.save(&snapshot).await;

        // 8. Re-read the conversation for the final payload
        let messages = self
            .store
            .find_by_id(&conversation_id)
            .await?
            .map(|c| c.messages)
            .unwrap_or_default();

        Ok(ChatResponse {
            response: reply.text,
            conversation_id,
            messages,
            metadata: ResponseMetadata {
                model_id,
                tokens_used: reply.total_tokens,
                response_time_ms,
            },
        })
    }

    async fn resolve_conversation(
        &self,
        conversation_id: Option<&str>,
        request: &ChatRequest,
    ) -> Result<Conversation> {
        if let Some(id) = conversation_id {
            if let Some(existing) = self.store.find_by_id(id).await? {
                return Ok(existing);
            }
        }
        self.store
            .create(&request.owner_id, request.model_id.clone())
            .await
    }

    /// Stored transcript of a conversation, or `None` if it is absent.
    pub async fn history(&self, conversation_id: &str) -> Result<Option<Conversation>> {
        self.store.find_by_id(conversation_id).await
    }

    /// Discard retained history under the given policy.
    pub async fn clear(&self, conversation_id: &str, policy: RetentionPolicy) -> Result<()> {
        self.strategies.select(policy).clear(conversation_id).await
    }

    /// Last snapshot taken for a conversation, if one is still stored.
    pub async fn restore_snapshot(&self, conversation_id: &str) -> Option<Snapshot> {
        self.snapshots.restore(conversation_id).await
    }

    /// Administrative removal of a conversation's live record.
    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        self.store.delete(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::store::{NullDurableStore, Role, CONVERSATION_TTL};
    use crate::snapshot::SNAPSHOT_TTL;
    use std::sync::Mutex;

    /// Scripted model: pops replies in order, errors when exhausted.
    struct ScriptedModel {
        replies: Mutex<Vec<&'static str>>,
    }

    impl ScriptedModel {
        fn new(mut replies: Vec<&'static str>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(&self, _system: &str, _user: &str) -> Result<ModelReply> {
            let mut replies = self.replies.lock().unwrap();
            match replies.pop() {
                Some(text) => Ok(ModelReply {
                    text: text.to_string(),
                    total_tokens: Some(7),
                }),
                None => Err(Error::Model("script exhausted".to_string())),
            }
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ModelClient for FailingModel {
        async fn generate(&self, _system: &str, _user: &str) -> Result<ModelReply> {
            Err(Error::Model("provider unavailable".to_string()))
        }
    }

    fn orchestrator(model: Arc<dyn ModelClient>) -> SessionOrchestrator {
        let cache: Arc<dyn crate::cache::CacheStore> = Arc::new(InMemoryCache::new());
        let store = Arc::new(ConversationStore::new(
            cache.clone(),
            Arc::new(NullDurableStore),
            CONVERSATION_TTL,
        ));
        SessionOrchestrator::new(
            store.clone(),
            StrategySelector::new(store.clone(), 10),
            SnapshotManager::new(cache, SNAPSHOT_TTL),
            model,
            Arc::new(StaticSystemPrompt::new("You are a helpful assistant.")),
            "gpt-test",
        )
    }

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_string(),
            owner_id: "u1".to_string(),
            model_id: None,
        }
    }

    #[tokio::test]
    async fn test_first_message_creates_conversation() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(vec!["hello"])));

        let response = orchestrator
            .process_message(request("hi"), None, RetentionPolicy::RecentWindow)
            .await
            .unwrap();

        assert_eq!(response.response, "hello");
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].role, Role::User);
        assert_eq!(response.messages[0].content, "hi");
        assert_eq!(response.messages[1].role, Role::Assistant);
        assert_eq!(response.metadata.model_id, "gpt-test");
        assert_eq!(response.metadata.tokens_used, Some(7));
    }

    #[tokio::test]
    async fn test_followup_continues_transcript() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(vec!["hello", "fine"])));

        let first = orchestrator
            .process_message(request("hi"), None, RetentionPolicy::FullHistory)
            .await
            .unwrap();
        let second = orchestrator
            .process_message(
                request("how are you?"),
                Some(&first.conversation_id),
                RetentionPolicy::FullHistory,
            )
            .await
            .unwrap();

        assert_eq!(second.conversation_id, first.conversation_id);
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.messages[3].content, "fine");
    }

    #[tokio::test]
    async fn test_unknown_conversation_id_starts_fresh() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(vec!["hello"])));

        let response = orchestrator
            .process_message(
                request("hi"),
                Some("conv_gone"),
                RetentionPolicy::RecentWindow,
            )
            .await
            .unwrap();

        assert_ne!(response.conversation_id, "conv_gone");
        assert_eq!(response.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_recent_window_limit_one_returns_last_assistant_message() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(vec!["hello"])));

        let response = orchestrator
            .process_message(request("hi"), None, RetentionPolicy::RecentWindow)
            .await
            .unwrap();

        let context = orchestrator
            .strategies
            .select(RetentionPolicy::RecentWindow)
            .context_messages(&response.conversation_id, Some(1))
            .await
            .unwrap();

        assert_eq!(context.len(), 1);
        assert_eq!(context[0].role, Role::Assistant);
        assert_eq!(context[0].content, "hello");
    }

    #[tokio::test]
    async fn test_snapshot_taken_per_completed_exchange() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(vec!["hello"])));

        let response = orchestrator
            .process_message(request("hi"), None, RetentionPolicy::RecentWindow)
            .await
            .unwrap();

        let snapshot = orchestrator
            .restore_snapshot(&response.conversation_id)
            .await
            .unwrap();
        assert_eq!(snapshot.conversation_id, response.conversation_id);
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.model_id, "gpt-test");
    }

    #[tokio::test]
    async fn test_model_failure_wraps_into_processing_failed() {
        let orchestrator = orchestrator(Arc::new(FailingModel));

        let err = orchestrator
            .process_message(request("hi"), None, RetentionPolicy::RecentWindow)
            .await
            .unwrap_err();

        match err {
            Error::ProcessingFailed { source } => {
                assert!(matches!(*source, Error::Model(_)));
            }
            other => panic!("expected ProcessingFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_run_leaves_user_message_committed() {
        let orchestrator = orchestrator(Arc::new(FailingModel));

        let conversation = orchestrator.store.create("u1", None).await.unwrap();
        let err = orchestrator
            .process_message(
                request("hi"),
                Some(&conversation.id),
                RetentionPolicy::RecentWindow,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProcessingFailed { .. }));

        // At-least-once effects: the user message committed before the
        // model call failed, and no snapshot was taken.
        let found = orchestrator.history(&conversation.id).await.unwrap().unwrap();
        assert_eq!(found.messages.len(), 1);
        assert_eq!(found.messages[0].content, "hi");
        assert!(orchestrator.restore_snapshot(&conversation.id).await.is_none());
    }

    #[tokio::test]
    async fn test_explicit_model_id_flows_into_metadata() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(vec!["hello"])));

        let response = orchestrator
            .process_message(
                ChatRequest {
                    prompt: "hi".to_string(),
                    owner_id: "u1".to_string(),
                    model_id: Some("gpt-other".to_string()),
                },
                None,
                RetentionPolicy::RecentWindow,
            )
            .await
            .unwrap();

        assert_eq!(response.metadata.model_id, "gpt-other");
        let assistant = &response.messages[1];
        assert_eq!(assistant.metadata["model_id"], json!("gpt-other"));
        assert_eq!(assistant.metadata["tokens_used"], json!(7));
    }

    #[tokio::test]
    async fn test_clear_respects_policy() {
        let orchestrator = orchestrator(Arc::new(ScriptedModel::new(vec!["hello"])));
        let response = orchestrator
            .process_message(request("hi"), None, RetentionPolicy::RecentWindow)
            .await
            .unwrap();
        let id = response.conversation_id;

        // Full-history clear never discards
        orchestrator.clear(&id, RetentionPolicy::FullHistory).await.unwrap();
        assert_eq!(orchestrator.history(&id).await.unwrap().unwrap().messages.len(), 2);

        // Recent-window clear empties the transcript
        orchestrator.clear(&id, RetentionPolicy::RecentWindow).await.unwrap();
        assert!(orchestrator.history(&id).await.unwrap().unwrap().messages.is_empty());
    }
}
